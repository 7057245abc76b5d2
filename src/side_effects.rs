//! `sideEffects` manifest matching. The field is either a boolean or a list
//! of globs naming the files that do have side effects; everything else in
//! the package is fair game for the shaker.

use glob::Pattern;
use glob_match::glob_match;

pub fn match_flag(flag: &serde_json::Value, path: &str) -> bool {
    match flag {
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::String(flag) => match_glob_pattern(flag, path),
        serde_json::Value::Array(flags) => flags.iter().any(|flag| match_flag(flag, path)),
        // Malformed manifests are treated as side-effectful.
        _ => true,
    }
}

fn match_glob_pattern(pattern: &str, path: &str) -> bool {
    let trimmed = path.trim_start_matches("./");

    // A pattern without a separator matches the basename anywhere in the
    // package, the same way bundler sideEffects matching treats it.
    if !pattern.contains('/') {
        return Pattern::new(format!("**/{}", pattern).as_str())
            .map(|p| p.matches(trimmed))
            .unwrap_or(true);
    }

    glob_match(pattern.trim_start_matches("./"), trimmed)
}

/// Path of `path` relative to the package root, in the `./`-prefixed
/// forward-slash form `sideEffects` globs are written against.
pub fn relative_to_root(path: &str, root: &str) -> String {
    let path = path.replace('\\', "/");
    let root = root.replace('\\', "/");
    let relative = path
        .strip_prefix(root.trim_end_matches('/'))
        .unwrap_or(&path)
        .trim_start_matches('/');
    format!("./{}", relative)
}

#[cfg(test)]
mod tests {
    use super::{match_flag, match_glob_pattern, relative_to_root};

    #[test]
    fn test_path_side_effects_no_dot_start_pattern() {
        assert!(match_glob_pattern("esm/index.js", "./esm/index.js",));
    }

    #[test]
    fn test_exact_path_side_effects_flag() {
        assert!(match_glob_pattern("./src/index.js", "./src/index.js",));
    }

    #[test]
    fn test_exact_path_side_effects_flag_negative() {
        assert!(!match_glob_pattern("./src/index.js", "./dist/index.js",));
    }

    #[test]
    fn test_wild_effects_flag() {
        assert!(match_glob_pattern(
            "./src/lib/**/*.s.js",
            "./src/lib/apple/pie/index.s.js",
        ));
    }

    #[test]
    fn test_double_wild_starts_effects_flag() {
        assert!(match_glob_pattern(
            "**/index.js",
            "./deep/lib/file/index.js",
        ));
    }

    #[test]
    fn test_boolean_and_array_flags() {
        assert!(match_flag(&serde_json::json!(true), "./a.js"));
        assert!(!match_flag(&serde_json::json!(false), "./a.js"));
        assert!(match_flag(
            &serde_json::json!(["./a.css", "./polyfill.js"]),
            "./polyfill.js"
        ));
        assert!(!match_flag(
            &serde_json::json!(["./a.css", "./polyfill.js"]),
            "./lib/util.js"
        ));
    }

    #[test]
    fn test_relative_to_root() {
        assert_eq!(
            relative_to_root("/app/node_modules/pkg/esm/index.js", "/app/node_modules/pkg"),
            "./esm/index.js"
        );
        assert_eq!(relative_to_root("/app/src/main.js", "/app"), "./src/main.js");
    }
}
