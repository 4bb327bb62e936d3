use safer_config::BrowserConfig;
use serde_json::json;
use webdriver::capabilities::Capabilities;

/// Chrome command-line arguments for a non-interactive, sandboxless,
/// fixed-viewport session.
pub fn build_launch_arguments(config: &BrowserConfig) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!(
            "--window-size={},{}",
            config.window_width, config.window_height
        ),
    ];
    if config.headless {
        args.push("--headless".to_string());
        args.push("--disable-gpu".to_string());
    }
    for extra in &config.extra_args {
        if !args.contains(extra) {
            args.push(extra.clone());
        }
    }
    args
}

/// WebDriver capabilities requesting a Chrome session with [`build_launch_arguments`].
pub fn build_capabilities(config: &BrowserConfig) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": build_launch_arguments(config) }),
    );
    caps
}
