mod readiness;
mod requests;
