pub mod auth;
pub mod cli;
pub mod hasura;
pub mod kadra;
