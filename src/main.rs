extern crate herald;
extern crate clap;
#[macro_use]
extern crate log;

use clap::{App, ArgMatches};
use herald::{Config, Dispatcher, Priority, config::clap::Action, observer};
use std::sync::Arc;

fn parse_cmdline() -> ArgMatches<'static> {
    let app = App::new("Test-lifecycle event dispatcher")
                          .version(env!("CARGO_PKG_VERSION"))
                          .author(env!("CARGO_PKG_AUTHORS"))
                          .about(env!("CARGO_PKG_DESCRIPTION"));
    let app = herald::config::clap::mount_inside_app(app, true);

    app.get_matches()
}

fn run(arg_matches: &ArgMatches) -> herald::Result<bool> {
    let mut config = Config::default();

    match herald::config::clap::parse_arguments(arg_matches, &mut config, &mut std::io::stdout())? {
        Action::Exit => return Ok(true),
        Action::Replay => (),
    }

    let dispatcher = Dispatcher::with_config(&config);
    dispatcher.register_with_priority(Arc::new(observer::Log::new()), Priority::FIRST)?;
    dispatcher.register(Arc::new(observer::Console::new(config.verbose)))?;
    if let Some(ref path) = config.report_path {
        dispatcher.register_with_priority(Arc::new(observer::Report::new(path.clone())), Priority::LAST)?;
    }

    let outcome = herald::replay::scripts(&dispatcher, &config);
    let close_failures = dispatcher.shutdown()?;
    let outcome = outcome?;

    if outcome.observer_failures > 0 || !close_failures.is_empty() {
        warn!("{} observer failure(s) were isolated during the run",
              outcome.observer_failures + close_failures.len());
    }

    Ok(outcome.is_successful())
}

fn main() {
    pretty_env_logger::init();

    let arg_matches = parse_cmdline();

    match run(&arg_matches) {
        Ok(true) => (),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {}", e);
            for cause in e.iter().skip(1) {
                eprintln!("caused by: {}", cause);
            }

            std::process::exit(2);
        },
    }
}
