//! Runs a peer that goes dark after a while.
//!
//! # Usage
//!
//! The demo creates a tun device, which requires `CAP_NET_ADMIN` (root or sudo), and answers
//! connections to every address of its subnet other than the host address. After the given delay
//! it stops answering without closing anything.
//!
//! 1. Start the demo, answering for 10.1.0.0/24 and going silent after 30 seconds:
//!
//!   > $ cargo run --example blackhole -- ffdemo%d 10.1.0.10/24 30
//! 2. Connect from the host and type some lines (each is acknowledged until the peer is silenced):
//!
//!   > $ nc 10.1.0.20 1000
//! 3. Watch the retransmissions once silenced, for example with `ss -ti dst 10.1.0.20`.
use std::convert::TryFrom;
use std::io::{stdout, Write};
use std::process;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;

use failfast::harness::{Config, Interface};

fn main() {
    let Options {
        name,
        host,
        silence_after,
    } = Options::from_args();

    let interface = match Interface::open(host.with_name(name)) {
        Ok(interface) => interface,
        Err(err) if err.is_unprivileged() => {
            eprintln!("Can not create a tun device, run with CAP_NET_ADMIN: {}", err);
            process::exit(1);
        },
        Err(err) => panic!("Couldn't initialize interface: {}", err),
    };

    let out = stdout();
    let mut out = out.lock();

    writeln!(out, "Answering on {}", interface.name()).unwrap();
    thread::sleep(Duration::from_secs(silence_after));

    interface.silence().set(true);
    writeln!(out, "Silenced, no more packets are answered").unwrap();

    while interface.is_running() {
        thread::sleep(Duration::from_secs(1));
    }

    interface.close().expect("Interface failed");
}

#[derive(StructOpt)]
struct Options {
    name: String,
    #[structopt(parse(try_from_str = parse_host))]
    host: Config,
    silence_after: u64,
}

fn parse_host(cidr: &str) -> Result<Config, failfast::Error> {
    Config::try_from(cidr)
}
