//! Logging to stderr and to a log file in the output directory
//!

use camino::Utf8Path;
use log::LevelFilter;

use crate::cli;
use crate::globals::PROGRAM_NAME;
use crate::os_utils::create_dir_all;

fn get_log_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Build the dispatcher writing `[date][time][svchain][LEVEL] message` lines
///
/// Output goes to stderr, and also to `svchain.log` when an output directory is given.
///
fn get_dispatch(
    output_dir: Option<&Utf8Path>,
    level: LevelFilter,
) -> Result<fern::Dispatch, fern::InitError> {
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROGRAM_NAME,
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    Ok(match output_dir {
        Some(output_dir) => {
            let log_filename = output_dir.join(format!("{PROGRAM_NAME}.log"));
            dispatch.chain(fern::log_file(log_filename)?)
        }
        None => dispatch,
    })
}

/// Create the output directory and start logging into it
///
/// An existing output directory is only reused when clobber is set. Errors are reported the same
/// way as command-line setting errors, since no logger exists yet.
///
pub fn setup_output_dir_and_logger(output_dir: &Utf8Path, clobber: bool, debug: bool) {
    if let Err(msg) = cli::check_novel_dirname(output_dir, "Output directory") {
        if !(clobber && output_dir.is_dir()) {
            eprintln!("Invalid command-line setting: {msg}");
            std::process::exit(exitcode::USAGE);
        }
    }
    create_dir_all(output_dir, "output");

    let result = get_dispatch(Some(output_dir), get_log_level(debug))
        .and_then(|x| x.apply().map_err(fern::InitError::from));
    if let Err(err) = result {
        eprintln!("Unable to start logging in output directory '{output_dir}': {err}");
        std::process::exit(exitcode::CANTCREAT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        assert_eq!(get_log_level(true), LevelFilter::Debug);
        assert_eq!(get_log_level(false), LevelFilter::Info);
    }
}
