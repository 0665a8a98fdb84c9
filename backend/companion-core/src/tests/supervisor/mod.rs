mod launch;
mod shutdown;
