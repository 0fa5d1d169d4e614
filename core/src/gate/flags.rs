use crate::error::FlagError;

/// Parsed verifier flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateArgs {
    pub name: String,
    pub digest: String,
    /// Accepted for compatibility with the image verifier protocol; unused.
    pub stdin_media_type: Option<String>,
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagParse {
    Run(GateArgs),
    Help,
}


pub const USAGE: &str = "\
Usage of scope-verifier:
  -digest string
    \tContainer image digest (required)
  -name string
    \tContainer image name (required)
  -stdin-media-type string
    \tStdin media type";


/// Parse verifier flags, as passed by the container runtime.
///
/// Flags take one or two leading dashes and either `-flag value` or
/// `-flag=value`. Parsing stops at the first non-flag argument or at `--`.
/// Arguments are expected WITHOUT the program name.
pub fn parse_flags(args: &[&str]) -> Result<FlagParse, FlagError> {
    let mut name = None;
    let mut digest = None;
    let mut stdin_media_type = None;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i];
        if arg == "--" || !arg.starts_with('-') || arg == "-" {
            break;
        }
        let flag = arg.trim_start_matches('-');
        let (key, inline) = match flag.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (flag, None),
        };
        if matches!(key, "h" | "help") {
            return Ok(FlagParse::Help);
        }
        let slot = match key {
            "name" => &mut name,
            "digest" => &mut digest,
            "stdin-media-type" => &mut stdin_media_type,
            other => return Err(FlagError::Unknown(other.to_string())),
        };
        let value = match inline {
            Some(value) => value.to_string(),
            None => {
                i += 1;
                take_arg(args, i, key)?
            }
        };
        *slot = Some(value);
        i += 1;
    }

    let name = name.filter(|n| !n.is_empty()).ok_or(FlagError::Required("name"))?;
    let digest = digest
        .filter(|d| !d.is_empty())
        .ok_or(FlagError::Required("digest"))?;
    Ok(FlagParse::Run(GateArgs {
        name,
        digest,
        stdin_media_type: stdin_media_type.filter(|t| !t.is_empty()),
    }))
}


fn take_arg(args: &[&str], i: usize, flag: &str) -> Result<String, FlagError> {
    args.get(i)
        .map(|s| s.to_string())
        .ok_or_else(|| FlagError::MissingValue(flag.to_string()))
}
