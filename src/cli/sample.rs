//! Argument parsing for the sampling commands

use super::CliError;
use crate::branch::Branch;

/// Parses `slug=ratio`.
pub fn parse_branch_spec(spec: &str) -> Result<Branch, CliError> {
    let invalid = || CliError::InvalidBranch(spec.to_string());

    let (slug, ratio) = spec.rsplit_once('=').ok_or_else(invalid)?;
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(invalid());
    }
    let ratio = ratio.trim().parse::<u64>().map_err(|_| invalid())?;
    Ok(Branch::new(slug, ratio))
}

pub fn parse_branches(specs: &[String]) -> Result<Vec<Branch>, CliError> {
    specs.iter().map(|spec| parse_branch_spec(spec)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_branch_spec() {
        assert_eq!(parse_branch_spec("control=1").unwrap(), Branch::new("control", 1));
        assert_eq!(parse_branch_spec("a=b=3").unwrap(), Branch::new("a=b", 3));
        for bad in ["control", "=1", "control=-1", "control=x"] {
            assert!(matches!(parse_branch_spec(bad), Err(CliError::InvalidBranch(_))));
        }
    }
}
