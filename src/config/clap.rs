//! Routines for exposing a command line interface via the `clap` crate.
//!
//! These routines can be used to update `Config` objects with automatic CLI arguments.

use crate::{Config, DispatchOrder, FailurePolicy};
use clap::{App, Arg, ArgMatches, SubCommand};
use std::io::Write;

/// The accepted values of `--ordering`.
const ORDERING_VALUES: &'static [(&'static str, DispatchOrder)] = &[
    ("priority", DispatchOrder::PriorityThenInsertion),
    ("insertion", DispatchOrder::Insertion),
];

const SHOW_OPTION_VALUES: &'static [(&'static str, fn(&Config, &mut dyn Write) -> crate::Result<()>)] = &[
    ("script-paths", |config, writer| {
        for path in crate::replay::find_scripts(config)? {
            writeln!(writer, "{}", path.display())?;
        }

        Ok(())
    }),
    ("config", |config, writer| {
        writeln!(writer, "{:#?}", config)?;
        Ok(())
    }),
];

lazy_static! {
    static ref ORDERING_HELP: String = {
        let values = ORDERING_VALUES.iter().map(|d| d.0).collect::<Vec<_>>();

        format!("Sets the order observers are invoked in. Possible values are: {}. Defaults to 'priority'", values.join(", "))
    };

    static ref SHOW_SUBCOMMAND_WHAT_OPTION_HELP: String = {
        let show_option_vals = SHOW_OPTION_VALUES.iter().map(|d| format!("    - {}", d.0)).collect::<Vec<_>>();
        let show_option_vals = show_option_vals.join("\n");

        format!("Show only a specific value. Possible values are:\n{}\nIf this value is not specified, all values are shown", show_option_vals)
    };
}

/// What the caller should do after the arguments have been parsed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Replay the configured scripts.
    Replay,
    /// Only information was requested and it has been printed.
    Exit,
}

/// Mounts the dispatcher and replay arguments into a `clap` CLI application.
pub fn mount_inside_app<'a, 'b>(
    app: App<'a, 'b>,
    script_paths_as_positional_arguments: bool,
) -> App<'a, 'b> {
    let app = app
        .arg(Arg::with_name("supported-file-extension")
            .long("add-file-extension")
            .takes_value(true)
            .value_name("EXT")
            .multiple(true)
            .help("Adds a file extension to the script search list. Extensions can be specified either with or without a leading period"))
        .arg(Arg::with_name("abort-on-observer-error")
            .long("abort-on-observer-error")
            .help("Stops the run as soon as an observer fails, instead of reporting the failure and carrying on"))
        .arg(Arg::with_name("ordering")
            .long("ordering")
            .takes_value(true)
            .value_name("ORDER")
            .help(&ORDERING_HELP[..]))
        .arg(Arg::with_name("report")
            .long("report")
            .takes_value(true)
            .value_name("FILE")
            .help("Writes a plain text report of the run to FILE once all scripts have been replayed"))
        .arg(Arg::with_name("quiet")
            .long("quiet")
            .short("q")
            .help("Only prints one line per finished test"))
        .subcommand(SubCommand::with_name("show")
            .about("Shows information about the run, without replaying any scripts")
            .arg(Arg::with_name("what")
                .takes_value(true)
                .value_name("WHAT")
                .help(&SHOW_SUBCOMMAND_WHAT_OPTION_HELP)));

    let script_paths_arg = {
        let mut arg = Arg::with_name("add-scripts")
            .takes_value(true)
            .value_name("PATH TO SCRIPT OR SCRIPTS")
            .multiple(true)
            .help("Adds a path to the script search pathset. If the path refers to a directory, it will be recursed, if it refers to a file, it will be treated as an event script");

        // If positional arguments are disabled, add this as a longhand option anyway.
        if !script_paths_as_positional_arguments {
            arg = arg.long("add-scripts");
        }

        arg
    };

    app.arg(script_paths_arg)
}

/// Parses command line arguments from `clap` into a destination `Config` object.
///
/// Handles the `show` subcommand by printing to `writer`.
pub fn parse_arguments(matches: &ArgMatches,
                       destination_config: &mut Config,
                       writer: &mut dyn Write) -> crate::Result<Action> {
    if let Some(extensions) = matches.values_of("supported-file-extension") {
        for extension in extensions {
            destination_config.add_extension(extension);
        }
    }

    if let Some(script_paths) = matches.values_of("add-scripts") {
        for script_path in script_paths {
            destination_config.add_search_path(script_path);
        }
    }

    if matches.is_present("abort-on-observer-error") {
        destination_config.failure_policy = FailurePolicy::Abort;
    }

    if let Some(ordering) = matches.value_of("ordering") {
        match ORDERING_VALUES.iter().find(|(name, _)| *name == ordering.trim()) {
            Some(&(_, order)) => destination_config.ordering = order,
            None => bail!("unknown ordering: '{}'", ordering),
        }
    }

    if let Some(report) = matches.value_of("report") {
        destination_config.report_path = Some(report.into());
    }

    if matches.is_present("quiet") {
        destination_config.verbose = false;
    }

    // NOTE: should process subcommands at the very end
    if let Some(matches) = matches.subcommand_matches("show") {
        let what_fns: Vec<_> = match matches.value_of("what") {
            Some(what) => {
                match SHOW_OPTION_VALUES.iter().find(|(name, _)| *name == what) {
                    Some(&(name, what_fn)) => vec![(name, what_fn)],
                    None => bail!("unknown show value: '{}'", what),
                }
            },
            None => SHOW_OPTION_VALUES.to_vec(),
        };

        let show_labels = what_fns.len() > 1;
        for (label, what_fn) in what_fns {
            if show_labels {
                writeln!(writer, "=================================================================")?;
                writeln!(writer, "{}:", label)?;
                writeln!(writer, "=================================================================")?;
                writeln!(writer)?;
            }

            what_fn(destination_config, &mut *writer)?;

            if show_labels {
                writeln!(writer)?;
            }
        }

        return Ok(Action::Exit);
    }

    Ok(Action::Replay)
}
