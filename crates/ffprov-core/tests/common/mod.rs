#![allow(dead_code)]

pub mod archive;
pub mod fakes;
pub mod range_server;
