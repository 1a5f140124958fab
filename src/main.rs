//! Smoke driver against a live JBOD server: connect, mount, grant write,
//! round-trip a byte range twice (the second pass exercises the cache), log
//! the hit rate, unmount.

use std::error::Error;
use std::process::ExitCode;

use clap::{value_parser, Arg, Command};
use log::{error, info};

use jbod_volume::{JbodClient, Volume};

fn main() -> ExitCode {
    env_logger::init();

    let matches = Command::new("jbod-volume")
        .about("linear volume over a networked JBOD array")
        .arg(
            Arg::new("server")
                .long("server")
                .default_value("127.0.0.1")
                .help("JBOD server address"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .value_parser(value_parser!(u16))
                .default_value("3000")
                .help("JBOD server port"),
        )
        .arg(
            Arg::new("cache-size")
                .long("cache-size")
                .value_parser(value_parser!(usize))
                .help("attach a block cache with this many entries"),
        )
        .get_matches();

    let server = matches.get_one::<String>("server").unwrap();
    let port = *matches.get_one::<u16>("port").unwrap();
    let cache_size = matches.get_one::<usize>("cache-size").copied();

    match run(server, port, cache_size) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(server: &str, port: u16, cache_size: Option<usize>) -> Result<(), Box<dyn Error>> {
    let client = JbodClient::connect(server, port)?;
    let mut volume = Volume::new(client);
    if let Some(capacity) = cache_size {
        volume.attach_cache(capacity)?;
    }

    volume.mount()?;
    volume.grant_write()?;

    let payload: Vec<u8> = (0..64).collect();
    volume.write(1000, &payload)?;

    let mut readback = vec![0u8; payload.len()];
    volume.read(1000, &mut readback)?;
    volume.read(1000, &mut readback)?;
    if readback != payload {
        return Err("read-back does not match what was written".into());
    }
    info!("round trip of {} bytes at address 1000 verified", payload.len());

    if let Some(cache) = volume.cache() {
        cache.log_hit_rate();
    }
    volume.unmount()?;
    Ok(())
}
