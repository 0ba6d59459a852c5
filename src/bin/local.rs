//! This is a binary running in the local environment
//!
//! You have to provide all needed configuration attributes via command line
//! parameters, or you could specify a configuration file. The format of the
//! configuration file is defined in mod `config`.

use std::{
    env,
    io::{self, Write},
    net::{IpAddr, Ipv4Addr, SocketAddr},
    process,
    time::Duration,
};

use cfg_if::cfg_if;
use chrono::Local;
use clap::{App, Arg};
use env_logger::fmt::Formatter;
use log::{debug, error, info, LevelFilter, Record};

use veilsocks::{
    config::{Config, ServerAddr, ServerConfig},
    crypto::cipher::CipherType,
    run_local,
};

fn log_time(fmt: &mut Formatter, without_time: bool, record: &Record) -> io::Result<()> {
    if without_time {
        writeln!(fmt, "[{}] {}", record.level(), record.args())
    } else {
        writeln!(
            fmt,
            "[{}][{}] {}",
            Local::now().format("%Y-%m-%d][%H:%M:%S%.6f"),
            record.level(),
            record.args()
        )
    }
}

fn log_time_module(fmt: &mut Formatter, without_time: bool, record: &Record) -> io::Result<()> {
    if without_time {
        writeln!(
            fmt,
            "[{}] [{}] {}",
            record.level(),
            record.module_path().unwrap_or("*"),
            record.args()
        )
    } else {
        writeln!(
            fmt,
            "[{}][{}] [{}] {}",
            Local::now().format("%Y-%m-%d][%H:%M:%S%.6f"),
            record.level(),
            record.module_path().unwrap_or("*"),
            record.args()
        )
    }
}

cfg_if! {
    if #[cfg(feature = "single-threaded")] {
        fn create_runtime() -> io::Result<tokio::runtime::Runtime> {
            tokio::runtime::Builder::new().basic_scheduler().enable_all().build()
        }
    } else {
        fn create_runtime() -> io::Result<tokio::runtime::Runtime> {
            tokio::runtime::Builder::new().threaded_scheduler().enable_all().build()
        }
    }
}

fn main() {
    let matches = App::new("veilsocks")
        .version(veilsocks::VERSION)
        .about("A lightweight encrypted SOCKS5 tunnel proxy.")
        .arg(
            Arg::with_name("VERBOSE")
                .short("v")
                .multiple(true)
                .help("Set the level of debug"),
        )
        .arg(
            Arg::with_name("CONFIG")
                .short("c")
                .long("config")
                .takes_value(true)
                .help("Specify config file"),
        )
        .arg(
            Arg::with_name("REMOTE_HOST")
                .short("s")
                .long("remote-host")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Remote relay address, may be given several times"),
        )
        .arg(
            Arg::with_name("REMOTE_PORT")
                .short("p")
                .long("remote-port")
                .takes_value(true)
                .help("Remote relay port"),
        )
        .arg(
            Arg::with_name("LOCAL_PORT")
                .short("l")
                .long("local-port")
                .takes_value(true)
                .help("Local SOCKS5 port"),
        )
        .arg(
            Arg::with_name("PASSWORD")
                .short("k")
                .long("password")
                .takes_value(true)
                .help("Password"),
        )
        .arg(
            Arg::with_name("ENCRYPT_METHOD")
                .short("m")
                .long("encrypt-method")
                .takes_value(true)
                .help("Encryption method, \"table\" by default"),
        )
        .arg(
            Arg::with_name("TIMEOUT")
                .short("t")
                .long("timeout")
                .takes_value(true)
                .help("Remote connect timeout in seconds, 10 by default"),
        )
        .arg(
            Arg::with_name("LOG_WITHOUT_TIME")
                .long("log-without-time")
                .help("Disable time in log"),
        )
        .get_matches();

    let mut log_builder = env_logger::Builder::new();
    log_builder.filter(None, LevelFilter::Info);

    let without_time = matches.is_present("LOG_WITHOUT_TIME");

    let debug_level = matches.occurrences_of("VERBOSE");
    match debug_level {
        0 => {
            // Default filter
            log_builder.format(move |fmt, r| log_time(fmt, without_time, r));
        }
        1 => {
            log_builder.format(move |fmt, r| log_time_module(fmt, without_time, r));
            log_builder.filter(Some("vslocal"), LevelFilter::Debug);
        }
        2 => {
            log_builder.format(move |fmt, r| log_time_module(fmt, without_time, r));
            log_builder
                .filter(Some("vslocal"), LevelFilter::Debug)
                .filter(Some("veilsocks"), LevelFilter::Debug);
        }
        3 => {
            log_builder.format(move |fmt, r| log_time_module(fmt, without_time, r));
            log_builder
                .filter(Some("vslocal"), LevelFilter::Trace)
                .filter(Some("veilsocks"), LevelFilter::Trace);
        }
        _ => {
            log_builder.format(move |fmt, r| log_time_module(fmt, without_time, r));
            log_builder.filter(None, LevelFilter::Trace);
        }
    }

    if let Ok(env_conf) = env::var("RUST_LOG") {
        log_builder.parse_filters(&env_conf);
    }

    log_builder.init();

    let mut has_provided_config = false;
    let mut config = match matches.value_of("CONFIG") {
        Some(cpath) => match Config::load_from_file(cpath) {
            Ok(cfg) => {
                has_provided_config = true;
                cfg
            }
            Err(err) => {
                error!("{:?}", err);
                return;
            }
        },
        None => Config::new(),
    };

    // Command line arguments win over the configuration file
    if let Some(timeout) = matches.value_of("TIMEOUT") {
        let timeout = Duration::from_secs(timeout.parse::<u64>().expect("invalid timeout"));
        config.timeout = Some(timeout);
        for svr in config.server.iter_mut() {
            svr.set_timeout(timeout);
        }
    }

    let has_provided_server_config = match (
        matches.values_of("REMOTE_HOST"),
        matches.value_of("REMOTE_PORT"),
        matches.value_of("PASSWORD"),
    ) {
        (Some(hosts), Some(port), Some(password)) => {
            let port = port.parse::<u16>().expect("invalid remote port");

            let method = match matches.value_of("ENCRYPT_METHOD") {
                Some(m) => match m.parse::<CipherType>() {
                    Ok(m) => m,
                    Err(err) => panic!("does not support {:?} method: {:?}", m, err),
                },
                None => CipherType::Table,
            };

            for host in hosts {
                let addr = match host.parse::<IpAddr>() {
                    Ok(ip) => ServerAddr::SocketAddr(SocketAddr::new(ip, port)),
                    Err(..) => ServerAddr::DomainName(host.to_owned(), port),
                };
                config
                    .server
                    .push(ServerConfig::new(addr, password.to_owned(), method, config.timeout));
            }

            true
        }
        (None, None, None) => {
            // Does not provide server config from command line
            false
        }
        _ => {
            panic!("`remote-host`, `remote-port` and `password` should be provided together");
        }
    };

    if let Some(local_port) = matches.value_of("LOCAL_PORT") {
        let port = local_port.parse::<u16>().expect("invalid local port");
        // the listener binds the wildcard address
        config.local = Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    if !has_provided_config && !has_provided_server_config {
        println!("You have to specify a configuration file or pass arguments from argument list");
        println!("{}", matches.usage());
        return;
    }

    if config.local.is_none() {
        println!("You have to provide a local port");
        println!("{}", matches.usage());
        return;
    }

    if config.server.is_empty() {
        println!("You have to provide at least one remote server");
        println!("{}", matches.usage());
        return;
    }

    info!("veilsocks {}", veilsocks::VERSION);
    debug!("config: {:?}", config);

    let mut runtime = create_runtime().expect("failed to create tokio runtime");
    runtime.block_on(async move {
        match run_local(config).await {
            Ok(..) => {}
            Err(err) => {
                error!("local endpoint exited unexpectedly: {}", err);
                process::exit(1);
            }
        }
    });
}
