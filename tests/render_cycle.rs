#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use node_ip_watcher::output::{FileSink, ProcessRunner};
use node_ip_watcher::render::TemplateRenderer;
use node_ip_watcher::trigger::RenderTrigger;
use node_ip_watcher::types::{NodeAddress, NodeEvent, SourceEvent};
use node_ip_watcher::{Error, Outcome, Watcher};
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};

const TEMPLATE: &str = "{{#each nodes}}{{name}} {{external_ip}}\n{{/each}}\
                        {{#each static_ips}}static {{this}}\n{{/each}}";

struct Fixture {
    dir: TempDir,
    output: PathBuf,
    calls: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nodes.conf");
        let calls = dir.path().join("calls.log");
        Self { dir, output, calls }
    }

    /// A reload command that records each argument it is called with and
    /// exits with `code`.
    fn command(&self, code: i32) -> String {
        let script = self.dir.path().join(format!("reload-{}.sh", code));
        fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$1\" >> {}\nexit {}\n",
                self.calls.display(),
                code
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }

    fn watcher(&self, minimum: usize, command: String) -> Watcher {
        let trigger = RenderTrigger::new(
            vec!["10.0.0.1".into()],
            command,
            Box::new(TemplateRenderer::from_template(TEMPLATE).unwrap()),
            Box::new(FileSink::new(&self.output)),
            Box::new(ProcessRunner),
        );
        Watcher::new(minimum, trigger)
    }

    fn output(&self) -> String {
        fs::read_to_string(&self.output).unwrap()
    }

    fn calls(&self) -> Vec<String> {
        read_lines(&self.calls)
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

fn node(name: &str, ip: &str) -> NodeAddress {
    NodeAddress::new(name, Some(ip))
}

#[tokio::test]
async fn renders_and_reloads_once_per_change() {
    let fx = Fixture::new();
    let watcher = fx.watcher(1, fx.command(0));

    let outcome = watcher
        .on_initial_sync_complete(vec![node("node2", "5.6.7.8"), node("node1", "1.2.3.4")])
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Applied(_)));
    assert_eq!(
        fx.output(),
        "node1 1.2.3.4\nnode2 5.6.7.8\nstatic 10.0.0.1\n"
    );
    assert_eq!(fx.calls(), vec![fx.output.display().to_string()]);

    let outcome = watcher
        .on_node_event(NodeEvent::Updated(node("node1", "1.2.3.4")))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NoChange);

    watcher
        .on_node_event(NodeEvent::Deleted(node("node2", "5.6.7.8")))
        .await
        .unwrap();
    assert_eq!(fx.output(), "node1 1.2.3.4\nstatic 10.0.0.1\n");
    assert_eq!(fx.calls().len(), 2);

    let outcome = watcher
        .on_node_event(NodeEvent::Deleted(node("node1", "1.2.3.4")))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::BelowThreshold { live: 0, minimum: 1 });
    assert_eq!(fx.output(), "node1 1.2.3.4\nstatic 10.0.0.1\n");
    assert_eq!(fx.calls().len(), 2);
}

#[tokio::test]
async fn failing_command_leaves_change_pending() {
    let fx = Fixture::new();
    let watcher = fx.watcher(1, fx.command(3));

    let err = watcher
        .on_node_event(NodeEvent::Added(node("node1", "1.2.3.4")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommandExit { code: Some(3), .. }));
    // The file was still written before the command ran.
    assert_eq!(fx.output(), "node1 1.2.3.4\nstatic 10.0.0.1\n");
    assert_eq!(watcher.last_applied().await, None);

    // Nothing changed, but nothing was applied either, so it runs again.
    let err = watcher.maybe_render_and_execute().await.unwrap_err();
    assert!(matches!(err, Error::CommandExit { .. }));
    assert_eq!(fx.calls().len(), 2);
}

#[tokio::test]
async fn event_loop_drives_the_watcher() {
    let fx = Fixture::new();
    let watcher = fx.watcher(1, fx.command(0));
    let (tx, rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tx.send(SourceEvent::Synced(vec![node("node1", "1.2.3.4")]))
        .await
        .unwrap();
    tx.send(SourceEvent::Node(NodeEvent::Added(node("node2", "5.6.7.8"))))
        .await
        .unwrap();
    // A later re-list that missed node1's deletion.
    tx.send(SourceEvent::Synced(vec![node("node2", "5.6.7.8")]))
        .await
        .unwrap();
    drop(tx);

    let err = watcher.run(rx, shutdown_rx).await.unwrap_err();
    assert!(matches!(err, Error::WatchSource(_)));
    drop(shutdown_tx);

    assert_eq!(fx.output(), "node2 5.6.7.8\nstatic 10.0.0.1\n");
    assert_eq!(fx.calls().len(), 3);
}
