mod common;

use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Result};
use portal_core::feed::spawn_feed_task;
use tokio::io::AsyncWriteExt;

const TICK: Duration = Duration::from_millis(10);

async fn wait_until<F, Fut>(mut condition: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..300 {
        if condition().await {
            return Ok(());
        }
        tokio::time::sleep(TICK).await;
    }
    bail!("condition not reached within {:?}", TICK * 300)
}

#[tokio::test]
async fn feed_lines_are_applied_in_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("portal_driver.json");
    let feed = [
        "# captured from a live session",
        "",
        r#"{"title": "Fountain", "faction": 2}"#,
        r#"{"faction": 9}"#,
        "not json at all",
        common::full_deploy_payload(8, 100).as_str(),
    ]
    .join("\n");
    tokio::fs::write(&path, feed + "\n").await?;

    let portal = common::fresh_portal();
    let task = spawn_feed_task(portal.clone(), path, TICK);

    wait_until(|| {
        let portal = portal.clone();
        async move { portal.level() == 8 }
    })
    .await?;
    task.abort();

    let snapshot = portal.snapshot();
    assert_eq!(snapshot.title(), "Fountain");
    assert_eq!(snapshot.faction(), 1);
    assert_eq!(snapshot.health(), 100);

    let metrics = portal.metrics();
    assert_eq!(metrics.comments_skipped, 1);
    assert_eq!(metrics.parse_failures, 1);
    assert_eq!(metrics.rejected, 1);
    assert_eq!(metrics.committed, 2);
    assert_eq!(metrics.feed_lines, 4);
    Ok(())
}

#[tokio::test]
async fn feed_waits_for_missing_file_and_appended_lines() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("late_feed.json");

    let portal = common::fresh_portal();
    let task = spawn_feed_task(portal.clone(), path.clone(), TICK);

    tokio::time::sleep(TICK * 5).await;
    assert_eq!(portal.version(), 0);

    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(b"{\"title\": \"Mural\"}\n").await?;
    file.flush().await?;

    wait_until(|| {
        let portal = portal.clone();
        async move { portal.snapshot().title() == "Mural" }
    })
    .await?;

    file.write_all(b"{\"faction\": 1}\n").await?;
    file.flush().await?;

    wait_until(|| {
        let portal = portal.clone();
        async move { portal.faction() == 1 }
    })
    .await?;
    task.abort();

    assert_eq!(portal.version(), 2);
    Ok(())
}

#[tokio::test]
async fn half_written_line_is_applied_once_complete() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("split_feed.json");
    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(b"{\"title\": \"Ga").await?;
    file.flush().await?;

    let portal = common::fresh_portal();
    let task = spawn_feed_task(portal.clone(), path, TICK);

    tokio::time::sleep(TICK * 10).await;
    assert_eq!(portal.version(), 0);
    assert_eq!(portal.metrics().parse_failures, 0);

    file.write_all(b"zebo\"}\n").await?;
    file.flush().await?;

    wait_until(|| {
        let portal = portal.clone();
        async move { portal.snapshot().title() == "Gazebo" }
    })
    .await?;
    task.abort();

    let metrics = portal.metrics();
    assert_eq!(metrics.parse_failures, 0);
    assert_eq!(metrics.feed_lines, 1);
    Ok(())
}
