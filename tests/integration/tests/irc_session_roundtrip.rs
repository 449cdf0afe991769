use std::{path::Path, sync::Arc, time::Duration};

use chrono::Local;
use ichiryu_external::{ExternalRunner, ExternalRunnerSettings, Unconfigured};
use ichiryu_index::{load_or_build_index, save_index_cache, CatalogRecord, NameIndex};
use ichiryu_logstore::{log_file_name, LogStore};
use ichiryu_rules::{upsert_text_art, RuleConfig, RuleEngine, TextArtCatalog};
use ichiryu_session::{ReconnectSupervisor, SessionConfig, TcpTransport};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener,
    },
    sync::watch,
    time::timeout,
};

const CHANNEL: &str = "#wonted";
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

struct FakeServerClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl FakeServerClient {
    async fn accept(listener: &TcpListener) -> Self {
        let (socket, _) = timeout(STEP_TIMEOUT, listener.accept())
            .await
            .expect("bot should connect in time")
            .expect("accept");
        let (reader, writer) = socket.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn expect_line(&mut self, expected: &str) {
        let line = timeout(STEP_TIMEOUT, self.lines.next_line())
            .await
            .expect("bot should write in time")
            .expect("read line")
            .expect("connection open");
        assert_eq!(line, expected);
    }

    async fn send(&mut self, raw: &str) {
        self.writer
            .write_all(format!("{raw}\r\n").as_bytes())
            .await
            .expect("write to bot");
    }
}

fn build_rules(root: &Path) -> RuleEngine {
    let catalog = root.join("cards.json");
    let cache = root.join("cards.cache");
    std::fs::write(
        &catalog,
        r#"[
            {"name": "Lightning Bolt", "imgUrl": "http://img.example/209_lightningbolt.jpg"},
            {"name": "Lightning Bolt", "imgUrl": "http://img.example/4_lightningbolt.jpg"},
            {"name": "Counterspell", "imgUrl": "http://img.example/202_counterspell.jpg"}
        ]"#,
    )
    .expect("write catalog");
    let index = load_or_build_index(&cache, &catalog).expect("index builds");
    assert!(cache.exists(), "cache should be written after the first build");

    let art_path = root.join("ascii_art.json");
    upsert_text_art(&art_path, "ship", "   |\n  /|\n /_|\n").expect("store art");
    let art = TextArtCatalog::load(&art_path).expect("load art");

    RuleEngine::new(
        RuleConfig::new(CHANNEL, vec!["ichiryu".to_string(), "ichi".to_string()]),
        Arc::new(index),
        Arc::new(art),
    )
    .expect("rule engine")
}

#[test]
fn integration_cached_index_matches_fresh_build() {
    let temp = tempfile::tempdir().expect("tempdir");
    let records = vec![
        CatalogRecord::new("Black Lotus", "http://img.example/3_blacklotus.jpg"),
        CatalogRecord::new("Mox Pearl", "http://img.example/5_moxpearl.jpg"),
    ];
    let built = NameIndex::build(&records);
    let cache = temp.path().join("cards.cache");
    save_index_cache(&cache, &built).expect("save cache");

    let loaded = load_or_build_index(&cache, &temp.path().join("missing.json"))
        .expect("cache should satisfy the load without a catalog");
    assert_eq!(loaded, built);
}

#[tokio::test]
async fn integration_bot_logs_answers_and_reconnects_over_tcp() {
    let temp = tempfile::tempdir().expect("tempdir");
    let log_root = temp.path().join("logs");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();

    let mut supervisor = ReconnectSupervisor::new(
        Arc::new(TcpTransport::new("127.0.0.1", port)),
        SessionConfig {
            channel: CHANNEL.to_string(),
            nickname: "ichiryu".to_string(),
            realname: "ichiryu".to_string(),
        },
        build_rules(temp.path()),
        LogStore::new(log_root.clone(), "http://logs.example/"),
        ExternalRunner::new(
            Arc::new(Unconfigured),
            Arc::new(Unconfigured),
            ExternalRunnerSettings::default(),
        ),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let log_name = log_file_name(Local::now().date_naive(), CHANNEL);
    let log_link = format!("http://logs.example/{log_name}");

    let server = async move {
        let mut first = FakeServerClient::accept(&listener).await;
        first.expect_line("NICK ichiryu").await;
        first.expect_line("USER ichiryu 0 * :ichiryu").await;
        first.send(":irc.test 001 ichiryu :Welcome").await;
        first.expect_line("JOIN #wonted").await;
        first.send(":ichiryu!bot@host JOIN :#wonted").await;
        first.send("PING :irc.test").await;
        first.expect_line("PONG :irc.test").await;

        first
            .send(":alice!a@host PRIVMSG #wonted :I cast Lightning Bolt!")
            .await;
        first
            .expect_line("PRIVMSG #wonted :alice: http://img.example/209_lightningbolt.jpg")
            .await;
        first.send(":bob!b@host PRIVMSG #wonted :i cast conterspell").await;
        first.send(":bob!b@host PRIVMSG #wonted :s/conter/counter/").await;
        first
            .expect_line("PRIVMSG #wonted :bob meant to say: i cast counterspell")
            .await;
        first.send(":carol!c@host PRIVMSG #wonted :ichi, logs?").await;
        first
            .expect_line(&format!("PRIVMSG #wonted :carol: Logs can be found at {log_link}"))
            .await;
        first.send(":dave!d@host PRIVMSG ichiryu :hey").await;
        first
            .expect_line("NOTICE dave :It isn't nice to whisper!  Play nice with the group.")
            .await;
        first.send(":erin!e@host PRIVMSG #wonted :ship it").await;
        first.expect_line("PRIVMSG #wonted :   |").await;
        first.expect_line("PRIVMSG #wonted :  /|").await;
        first.expect_line("PRIVMSG #wonted : /_|").await;
        first.send(":erin!e@host QUIT :gone fishing").await;
        first.send(":irc.test ERROR :Closing link").await;
        drop(first);

        let mut second = FakeServerClient::accept(&listener).await;
        second.expect_line("NICK ichiryu").await;
        second.expect_line("USER ichiryu 0 * :ichiryu").await;
        second.send(":irc.test 433 * ichiryu :Nickname is already in use").await;
        second.expect_line("NICK ichiryu^").await;
        shutdown_tx.send(true).expect("signal shutdown");
        second.expect_line("QUIT :shutting down").await;
    };

    let (report, ()) = tokio::join!(supervisor.run(shutdown_rx), server);
    let report = report.expect("supervisor should stop cleanly");
    assert_eq!(report.sessions, 2);
    assert!(supervisor.rules().memory().last_message("bob").is_some());

    let log = std::fs::read_to_string(log_root.join(&log_name)).expect("channel log");
    let bodies = log
        .lines()
        .map(|line| line.split_once("] ").map_or(line, |(_, body)| body))
        .collect::<Vec<_>>();
    assert!(bodies[0].starts_with("[connected at "));
    assert_eq!(
        &bodies[1..8],
        &[
            "[I have joined #wonted]",
            "<alice> I cast Lightning Bolt!",
            "<ichiryu> alice: http://img.example/209_lightningbolt.jpg",
            "<bob> i cast conterspell",
            "<bob> s/conter/counter/",
            "<ichiryu> bob meant to say: i cast counterspell",
            "<carol> ichi, logs?",
        ]
    );
    assert!(log.contains("erin has quit [gone fishing] (erin!e@host)"));
    assert!(!log.contains("<dave> hey"));
    assert!(bodies
        .last()
        .is_some_and(|last| last.starts_with("[disconnected at ")));
}
