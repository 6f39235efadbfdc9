//! dimrules CLI: driving adapter for the dimlet rule engine.
//!
//! Subcommands:
//! - `resolve <type> <name> [--mod M] [--feature F]... [--config DIR] [--trace]`
//! - `check <file>`: parse a rule file and report malformed entries
//! - `regen [--config DIR]`: run the load/regenerate protocol
//! - `defaults`: print the bundled default rules

use std::path::{Path, PathBuf};
use std::process;

use dimrules::{parse_entries, DimletType, Feature, FeatureSet, RuleEntry, RuleStore};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the config directory.
const CONFIG_ENV: &str = "DIMRULES_CONFIG";

/// Config directory used when neither `--config` nor the environment names one.
const DEFAULT_CONFIG_DIR: &str = "config";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "resolve" => cmd_resolve(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "regen" => cmd_regen(&args[2..]),
        "defaults" => {
            print!("{}", dimrules::BUILTIN_RULES);
            Ok(())
        }
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_resolve(args: &[String]) -> Result<(), String> {
    let query = parse_resolve_args(args)?;
    let dir = config_dir(query.config.as_deref());
    tracing::debug!(kind = %query.kind, name = %query.name, mod_name = %query.mod_name, "resolving");

    let store = RuleStore::new();
    store.load(&dir);

    if query.trace {
        let trace =
            store.resolve_with_trace(query.kind, &query.mod_name, &query.name, &query.features);
        println!("{trace}");
        return Ok(());
    }

    let settings = store.resolve(query.kind, &query.mod_name, &query.name, &query.features);
    let text = serde_json::to_string_pretty(&settings.to_json()).map_err(|e| e.to_string())?;
    println!("{text}");
    if !settings.is_complete() {
        eprintln!("note: some fields are unset; the dimlet type's own defaults apply");
    }
    Ok(())
}

fn cmd_check(args: &[String]) -> Result<(), String> {
    let [path] = args else {
        return Err("check requires exactly one rule file path".into());
    };

    let text =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read \"{path}\": {e}"))?;
    let parsed = parse_entries(&text, path, false).map_err(|e| e.to_string())?;

    let mut rules = 0;
    let mut boundary = None;
    for (i, entry) in parsed.entries.iter().enumerate() {
        match entry {
            RuleEntry::Rule(_) => rules += 1,
            RuleEntry::Boundary if boundary.is_none() => boundary = Some(i),
            RuleEntry::Boundary => {}
        }
    }

    println!("{rules} rule(s)");
    match boundary {
        Some(i) => println!("boundary marker at entry {i}; entries below it are regenerated"),
        None => println!("no boundary marker; defaults are not appended"),
    }

    if parsed.errors.is_empty() {
        println!("Rules valid");
        return Ok(());
    }
    for e in &parsed.errors {
        println!("entry {}: {}", e.index, e.error);
    }
    Err(format!("found {} malformed entries", parsed.errors.len()))
}

fn cmd_regen(args: &[String]) -> Result<(), String> {
    let config = parse_config_only(args)?;
    let store = RuleStore::new();
    let report = store.load(config_dir(config.as_deref()));
    println!("{report}");
    if report.persisted {
        Ok(())
    } else {
        Err("rule file was not written; see log for details".into())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct ResolveArgs {
    kind: DimletType,
    name: String,
    mod_name: String,
    features: FeatureSet,
    config: Option<PathBuf>,
    trace: bool,
}

fn parse_resolve_args(args: &[String]) -> Result<ResolveArgs, String> {
    let mut positional = Vec::new();
    let mut mod_name = None;
    let mut features = FeatureSet::new();
    let mut config = None;
    let mut trace = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--mod" => mod_name = Some(flag_value(&mut iter, "--mod")?.to_owned()),
            "--feature" => {
                let value = flag_value(&mut iter, "--feature")?;
                features.insert(value.parse::<Feature>().map_err(|e| e.to_string())?);
            }
            "--config" => config = Some(PathBuf::from(flag_value(&mut iter, "--config")?)),
            "--trace" => trace = true,
            flag if flag.starts_with("--") => return Err(format!("unexpected flag \"{flag}\"")),
            _ => positional.push(arg.as_str()),
        }
    }

    let &[kind, name] = positional.as_slice() else {
        return Err("resolve requires <type> <name>".into());
    };
    let kind = kind.parse::<DimletType>().map_err(|e| e.to_string())?;
    let mod_name = mod_name.unwrap_or_else(|| mod_of(name).to_owned());

    Ok(ResolveArgs {
        kind,
        name: name.to_owned(),
        mod_name,
        features,
        config,
        trace,
    })
}

fn parse_config_only(args: &[String]) -> Result<Option<PathBuf>, String> {
    let mut iter = args.iter();
    let mut config = None;
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(flag_value(&mut iter, "--config")?)),
            other => return Err(format!("unexpected argument \"{other}\"")),
        }
    }
    Ok(config)
}

fn flag_value<'a>(
    iter: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<&'a str, String> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

/// The mod part of a namespaced id (`"minecraft:stone"` → `"minecraft"`).
fn mod_of(name: &str) -> &str {
    name.split_once(':').map_or("minecraft", |(m, _)| m)
}

fn config_dir(flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
}

fn print_usage() {
    eprintln!(
        "Usage: dimrules <command> [options]

Commands:
  resolve <type> <name> [--mod M] [--feature F]... [--config DIR] [--trace]
                          Resolve settings (regenerates the rule file first)
  check <file>            Validate a rule file
  regen [--config DIR]    Rebuild <config>/rftools/dimlets.json from defaults
  defaults                Print the bundled default rules
  help                    Show this help

The config directory defaults to ${CONFIG_ENV} or \"{DEFAULT_CONFIG_DIR}\".
Set RUST_LOG=debug for verbose logging."
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn resolve_args_minimal() {
        let parsed = parse_resolve_args(&args(&["material", "minecraft:stone"])).unwrap();
        assert_eq!(parsed.kind, DimletType::Material);
        assert_eq!(parsed.name, "minecraft:stone");
        assert_eq!(parsed.mod_name, "minecraft");
        assert!(parsed.features.is_empty());
        assert!(!parsed.trace);
    }

    #[test]
    fn resolve_args_full() {
        let parsed = parse_resolve_args(&args(&[
            "liquid",
            "thermal:pyrotheum",
            "--mod",
            "thermalfoundation",
            "--feature",
            "tileentity",
            "--feature",
            "falling",
            "--config",
            "/tmp/cfg",
            "--trace",
        ]))
        .unwrap();
        assert_eq!(parsed.kind, DimletType::Liquid);
        assert_eq!(parsed.mod_name, "thermalfoundation");
        assert_eq!(parsed.features.len(), 2);
        assert_eq!(parsed.config, Some(PathBuf::from("/tmp/cfg")));
        assert!(parsed.trace);
    }

    #[test]
    fn resolve_args_errors() {
        assert!(parse_resolve_args(&args(&["material"])).is_err());
        assert!(parse_resolve_args(&args(&["gem", "x"])).is_err());
        assert!(parse_resolve_args(&args(&["material", "x", "--feature", "shiny"])).is_err());
        assert!(parse_resolve_args(&args(&["material", "x", "--mod"])).is_err());
        assert!(parse_resolve_args(&args(&["material", "x", "--bogus"])).is_err());
    }

    #[test]
    fn mod_defaults_from_namespace() {
        assert_eq!(mod_of("biomesoplenty:flower"), "biomesoplenty");
        assert_eq!(mod_of("peaceful"), "minecraft");
    }

    #[test]
    fn config_flag_wins() {
        assert_eq!(
            config_dir(Some(Path::new("/etc/game"))),
            PathBuf::from("/etc/game")
        );
    }

    #[test]
    fn check_accepts_bundled_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dimlets.json");
        fs::write(&path, dimrules::BUILTIN_RULES).unwrap();
        assert!(cmd_check(&[path.display().to_string()]).is_ok());
    }

    #[test]
    fn check_rejects_malformed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dimlets.json");
        fs::write(&path, r#"[ { "settings": { "rarity": "x" } }, "regen" ]"#).unwrap();
        let err = cmd_check(&[path.display().to_string()]).unwrap_err();
        assert!(err.contains("1 malformed"));
    }

    #[test]
    fn regen_writes_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().display().to_string();
        cmd_regen(&args(&["--config", &config])).unwrap();
        assert!(RuleStore::rules_path(dir.path()).exists());
    }
}
