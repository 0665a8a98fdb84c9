mod connect;
mod readiness;
mod rpc;
