//! Config loading and federation validation tests for pelican-config.
// crates/pelican-config/tests/load_validation.rs
// =============================================================================
// Module: Load Validation Tests
// Description: Validate file loading limits, defaults, and discovery URLs.
// Purpose: Ensure configuration loading fails closed on bad input.
// =============================================================================

use std::fs;
use std::path::PathBuf;

use pelican_config::PelicanConfig;
use pelican_config::UnregisteredNamespacePolicy;

mod common;

use common::TestResult;
use common::assert_invalid;

#[test]
fn default_config_validates() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.federation.discovery_url != "pelican://osg-htc.org" {
        return Err("discovery_url should default to the OSDF federation".to_string());
    }
    if config.tokens.unregistered_namespace != UnregisteredNamespacePolicy::RequireToken {
        return Err("unregistered namespaces should default to require_token".to_string());
    }
    if config.federation.resolution_ttl_ms != 900_000 {
        return Err("resolution_ttl_ms should default to 15 minutes".to_string());
    }
    let scopes = config.tokens.scopes();
    if scopes.read != "storage.read" || scopes.write != "storage.create" {
        return Err("default scopes should be storage.read / storage.create".to_string());
    }
    Ok(())
}

#[test]
fn load_reads_and_validates_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("pelican-fs.toml");
    fs::write(
        &path,
        r#"
[federation]
discovery_url = "pelican://fed.example.org"

[access]
preferred_caches = ["https://cache.example.org:8443", "+"]

[access.headers]
X-Trace = "abc"

[tokens]
token_name = "my.token"
unregistered_namespace = "public"
"#,
    )
    .map_err(|err| err.to_string())?;
    let config = PelicanConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    let preferred = config.access.preferred().map_err(|err| err.to_string())?;
    if !preferred.include_director || preferred.urls.len() != 1 {
        return Err("preferred caches should parse one url plus the sentinel".to_string());
    }
    if preferred.urls[0].as_str() != "https://cache.example.org:8443/" {
        return Err(format!("unexpected preferred url {}", preferred.urls[0]));
    }
    if config.tokens.unregistered_namespace.requires_token() {
        return Err("public policy should not require tokens".to_string());
    }
    Ok(())
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("big.toml");
    let padding = "#".repeat(1024 * 1024 + 1);
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    assert_invalid(PelicanConfig::load(Some(&path)), "size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("binary.toml");
    fs::write(&path, [0xff_u8, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    assert_invalid(PelicanConfig::load(Some(&path)), "utf-8")
}

#[test]
fn load_rejects_overlong_path_component() -> TestResult {
    let path = PathBuf::from(format!("/tmp/{}.toml", "a".repeat(300)));
    assert_invalid(PelicanConfig::load(Some(&path)), "component too long")
}

#[test]
fn load_reports_missing_file_as_io() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    assert_invalid(PelicanConfig::load(Some(&dir.path().join("absent.toml"))), "config io error")
}

#[test]
fn unknown_unregistered_policy_fails_parse() -> TestResult {
    assert_invalid(
        PelicanConfig::from_toml("[tokens]\nunregistered_namespace = \"maybe\"\n"),
        "config parse error",
    )
}

#[test]
fn discovery_base_maps_schemes() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.federation.discovery_url = "pelican://fed.example.org:8444".to_string();
    let base = config.federation.discovery_base().map_err(|err| err.to_string())?;
    if base.as_str() != "https://fed.example.org:8444/" {
        return Err(format!("unexpected base {base}"));
    }
    config.federation.discovery_url = "osdf:///".to_string();
    let host = config.federation.federation_host().map_err(|err| err.to_string())?;
    if host != "osg-htc.org" || !config.federation.is_osdf() {
        return Err(format!("osdf should map to osg-htc.org, got {host}"));
    }
    Ok(())
}

#[test]
fn http_discovery_requires_opt_in() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.federation.discovery_url = "http://127.0.0.1:8080".to_string();
    assert_invalid(config.validate(), "allow_http")?;
    config.federation.allow_http = true;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn discovery_rejects_unknown_scheme_and_credentials() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.federation.discovery_url = "ftp://fed.example.org".to_string();
    assert_invalid(config.validate(), "not supported")?;
    config.federation.discovery_url = "https://user:pw@fed.example.org".to_string();
    assert_invalid(config.validate(), "credentials")?;
    Ok(())
}

#[test]
fn request_timeout_bounds_are_enforced() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.federation.request_timeout_ms = 99;
    assert_invalid(config.validate(), "federation.request_timeout_ms")?;
    config.federation.request_timeout_ms = 300_001;
    assert_invalid(config.validate(), "federation.request_timeout_ms")?;
    config.federation.request_timeout_ms = 300_000;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn resolution_ttl_is_capped() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.federation.resolution_ttl_ms = 0;
    config.validate().map_err(|err| err.to_string())?;
    config.federation.resolution_ttl_ms = 24 * 60 * 60 * 1_000 + 1;
    assert_invalid(config.validate(), "resolution_ttl_ms")
}

#[test]
fn resolution_cache_is_bounded() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    if config.federation.resolution_cache_entries != 50 {
        return Err("resolution_cache_entries should default to 50".to_string());
    }
    config.federation.resolution_cache_entries = 0;
    assert_invalid(config.validate(), "resolution_cache_entries")?;
    config.federation.resolution_cache_entries = 100_001;
    assert_invalid(config.validate(), "resolution_cache_entries")?;
    config.federation.resolution_cache_entries = 1;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}
