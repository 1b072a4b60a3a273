mod loops;
mod request;
mod url;
