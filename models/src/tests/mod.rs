mod server_info;
