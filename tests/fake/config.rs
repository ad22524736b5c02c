extern crate tlssocket;

use tlssocket::{config, socket};

#[allow(dead_code)] // Not every test binary uses it
pub fn read() -> config::Config {
    let config = config::ConfigLoader::new()
        .with_filename("tests/tlssocket.conf")
        .load()
        .unwrap();

    socket::log::setup(&None, &config.loglevel).unwrap();
    config
}
