mod support;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use stackmark_engine::{FetchSettings, PageFetcher, ProtocolSession, SessionError};
use support::{methods, reply, value, FakeBrowser};

const FALLBACK: &str = "document.documentElement.outerHTML";

fn settings() -> FetchSettings {
    FetchSettings {
        page_timeout: Duration::from_secs(10),
        poll_interval: Duration::from_millis(500),
        ..FetchSettings::default()
    }
}

fn is_fallback(request: &Value) -> bool {
    request["params"]["expression"] == json!(FALLBACK)
}

#[tokio::test(start_paused = true)]
async fn returns_probe_markup_once_article_renders() {
    let mut probes = 0;
    let browser = FakeBrowser::scripted(move |request| {
        if is_fallback(request) {
            return value(json!("<html>fallback</html>"));
        }
        probes += 1;
        if probes <= 3 {
            value(Value::Null)
        } else {
            value(json!("<html><article>ready</article></html>"))
        }
    });
    let log = browser.sent_log();
    let mut session = ProtocolSession::new(browser, Duration::from_secs(5));

    let html = PageFetcher::new(settings())
        .fetch(&mut session, "https://example.substack.com/p/a")
        .await
        .unwrap();

    assert_eq!(html, "<html><article>ready</article></html>");
    let sent = methods(&log);
    assert_eq!(sent.iter().filter(|m| *m == "Runtime.evaluate").count(), 4);
    assert_eq!(sent.last().map(String::as_str), Some("Target.closeTarget"));
}

#[tokio::test(start_paused = true)]
async fn falls_back_to_current_markup_without_failing() {
    let browser = FakeBrowser::scripted(|request| {
        if is_fallback(request) {
            value(json!("<html><body>spa shell</body></html>"))
        } else {
            value(Value::Null)
        }
    });
    let log = browser.sent_log();
    let mut session = ProtocolSession::new(browser, Duration::from_secs(5));

    let html = PageFetcher::new(settings())
        .fetch(&mut session, "https://example.substack.com/p/a")
        .await
        .unwrap();

    assert_eq!(html, "<html><body>spa shell</body></html>");
    assert!(log.lock().unwrap().iter().any(is_fallback));
    assert_eq!(
        methods(&log).last().map(String::as_str),
        Some("Target.closeTarget")
    );
}

#[tokio::test(start_paused = true)]
async fn readiness_probe_names_every_selector() {
    let browser = FakeBrowser::scripted(|_| value(json!("<html></html>")));
    let log = browser.sent_log();
    let mut session = ProtocolSession::new(browser, Duration::from_secs(5));

    PageFetcher::new(settings())
        .fetch(&mut session, "https://example.substack.com/p/a")
        .await
        .unwrap();

    let probe = log
        .lock()
        .unwrap()
        .iter()
        .find(|r| r["method"] == "Runtime.evaluate")
        .map(|r| r["params"]["expression"].as_str().unwrap().to_string())
        .unwrap();
    for selector in ["article", "main article", "div.post", "[data-test-id]"] {
        assert!(probe.contains(&format!("\"{selector}\"")), "{probe}");
    }
}

#[tokio::test(start_paused = true)]
async fn missing_load_event_is_tolerated() {
    let browser = FakeBrowser::new(|request| {
        let id = &request["id"];
        match request["method"].as_str().unwrap() {
            "Target.createTarget" => vec![reply(id, json!({"targetId": "T1"}))],
            "Target.attachToTarget" => vec![reply(id, json!({"sessionId": "S1"}))],
            "Runtime.evaluate" => vec![reply(id, value(json!("<article>x</article>")))],
            _ => vec![reply(id, json!({}))],
        }
    });
    let mut session = ProtocolSession::new(browser, Duration::from_secs(5));

    let html = PageFetcher::new(settings())
        .fetch(&mut session, "https://example.substack.com/p/a")
        .await
        .unwrap();
    assert_eq!(html, "<article>x</article>");
}

#[tokio::test(start_paused = true)]
async fn context_is_closed_when_navigation_fails() {
    let browser = FakeBrowser::new(|request| {
        let id = &request["id"];
        match request["method"].as_str().unwrap() {
            "Target.createTarget" => vec![reply(id, json!({"targetId": "T1"}))],
            "Target.attachToTarget" => vec![reply(id, json!({"sessionId": "S1"}))],
            "Page.navigate" => vec![json!({"id": id, "error": {"code": -32000, "message": "boom"}})],
            _ => vec![reply(id, json!({}))],
        }
    });
    let log = browser.sent_log();
    let mut session = ProtocolSession::new(browser, Duration::from_secs(5));

    let err = PageFetcher::new(settings())
        .fetch(&mut session, "https://example.substack.com/p/a")
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Protocol { .. }), "{err:?}");
    assert_eq!(
        methods(&log),
        vec![
            "Target.createTarget",
            "Target.attachToTarget",
            "Page.enable",
            "Page.navigate",
            "Target.closeTarget"
        ]
    );
}
