use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_regex::Regex as RandRegex;

pub const DEFAULT_MAX_REPEAT: u32 = 32;

/// Compile a pattern for sampling. Leading `^` and trailing `$` are dropped: generated text is
/// always matched as a whole.
pub fn compile(pattern: &str, max_repeat: u32) -> Result<RandRegex, String> {
    RandRegex::compile(strip_anchors(pattern), max_repeat).map_err(|err| err.to_string())
}

pub fn sample(regex: &RandRegex, rng: &mut ChaCha8Rng) -> String {
    rng.sample::<String, _>(regex)
}

fn strip_anchors(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    match pattern.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => pattern,
    }
}
