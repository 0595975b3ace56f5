//! Input file checks shared by all commands
//!
//! These run before the logger is configured, so failures are only returned as messages.
//!

use camino::Utf8Path;
use simple_error::{SimpleResult, bail};

fn check_input_file(filename: &str, label: &str) -> SimpleResult<()> {
    let path = Utf8Path::new(filename);
    if !path.exists() {
        bail!("The {label} file does not exist: '{filename}'");
    }
    if !path.is_file() {
        bail!("The {label} path is not a regular file: '{filename}'");
    }
    Ok(())
}

/// Check an input file which must be given on the command line
pub fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
    if filename.is_empty() {
        bail!("A {label} file must be provided");
    }
    check_input_file(filename, label)
}

/// Check an input file only if it was given on the command line
pub fn check_optional_filename(filename: Option<&String>, label: &str) -> SimpleResult<()> {
    filename.map_or(Ok(()), |x| check_input_file(x, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_file_checks() {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        let manifest = format!("{manifest_dir}/Cargo.toml");

        assert!(check_required_filename(&manifest, "sample input").is_ok());
        assert!(check_required_filename("", "sample input").is_err());
        assert!(check_required_filename(manifest_dir, "sample input").is_err());

        assert!(check_optional_filename(None, "gene regions").is_ok());
        let missing = format!("{manifest_dir}/missing.bed");
        assert!(check_optional_filename(Some(&missing), "gene regions").is_err());
    }
}
