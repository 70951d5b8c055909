// tests/relay_config.rs
use crypto_news_relay::config::relay::{Settings, Tunables, ENV_CONFIG_PATH};
use std::{env, fs};

#[test]
fn load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("relay.toml");
    fs::write(
        &p,
        r#"
sweep_interval_secs = 600
max_delivery_attempts = 5
footer_label = ""
"#,
    )
    .unwrap();
    let t = Tunables::load_from(&p).unwrap();
    assert_eq!(t.sweep_interval_secs, 600);
    assert_eq!(t.max_delivery_attempts, 5);
    assert_eq!(t.footer_label, None);
    assert_eq!(t.fetch_limit, 5);
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's config/ does not leak in.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    // 1) Nothing → defaults
    assert_eq!(Tunables::load_default().unwrap(), Tunables::default());

    // 2) Fallback ./config/relay.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(tmp.path().join("config/relay.toml"), "fetch_limit = 3").unwrap();
    assert_eq!(Tunables::load_default().unwrap().fetch_limit, 3);

    // 3) Env wins
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "fetch_limit = 8").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(Tunables::load_default().unwrap().fetch_limit, 8);

    // 4) Env pointing nowhere is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(Tunables::load_default().is_err());
    env::remove_var(ENV_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn settings_require_credentials_and_hide_them() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    env::remove_var("TELEGRAM_BOT_TOKEN");
    env::set_var("CRYPTOPANIC_API_KEY", "cp-key");
    env::set_var("CHANNEL_USERNAME", "@relay");
    let err = Settings::from_env().unwrap_err().to_string();
    assert!(err.contains("TELEGRAM_BOT_TOKEN"));

    env::set_var("TELEGRAM_BOT_TOKEN", "123:SECRET");
    env::set_var("LEDGER_PATH", "state/ledger.json");
    let s = Settings::from_env().unwrap();
    assert_eq!(s.channel, "@relay");
    assert_eq!(s.ledger_path, std::path::PathBuf::from("state/ledger.json"));
    assert!(!format!("{s:?}").contains("SECRET"));
    assert_eq!(s.sweep_timer_cfg().every, std::time::Duration::from_secs(300));
    assert_eq!(s.chat_timer_cfg().every, std::time::Duration::from_secs(30));

    for k in ["TELEGRAM_BOT_TOKEN", "CRYPTOPANIC_API_KEY", "CHANNEL_USERNAME", "LEDGER_PATH"] {
        env::remove_var(k);
    }
    env::set_current_dir(&old).unwrap();
}
