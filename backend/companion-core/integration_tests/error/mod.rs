mod client;
mod supervisor;
