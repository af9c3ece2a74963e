mod common;

use blogpost_sync_core::config::{DocFolderKind, SynchroniseConfig};
use blogpost_sync_core::contract::{MockPublisher, PublishedArticle};
use blogpost_sync_core::discovery::Discovery;
use blogpost_sync_core::publish::{sync_record, PublishOptions, SyncOutcome};
use blogpost_sync_core::record::SidecarState;
use blogpost_sync_core::synchronise::{synchronise, RecordStatus};
use blogpost_sync_core::SyncError;
use common::{sha_of, MemoryRepository};

const README: &str = "# Hello World\n\nBody text with ![pic](images/pic.png).";

fn post_config() -> SynchroniseConfig {
    SynchroniseConfig {
        kinds: vec![DocFolderKind::blog_post()],
        ..Default::default()
    }
}

fn article(slug: &str, id: &str) -> PublishedArticle {
    PublishedArticle {
        slug: slug.to_string(),
        id: id.to_string(),
    }
}

fn fresh_sidecar(readme: &str, slug: &str, id: &str) -> String {
    SidecarState {
        readme_sha: sha_of(readme),
        slug: slug.to_string(),
        article_id: id.to_string(),
    }
    .to_json()
}

#[tokio::test]
async fn fresh_record_makes_no_remote_calls_and_no_commit() {
    let repo = MemoryRepository::new()
        .with_file("posts/a/README.md", README)
        .with_file("posts/a/.blogpost/post.json", &fresh_sidecar(README, "hello", "1"));

    let mut publisher = MockPublisher::new();
    publisher.expect_create_article().times(0);
    publisher.expect_update_article().times(0);

    let mut record = Discovery::new(&repo, DocFolderKind::blog_post())
        .next()
        .await
        .unwrap()
        .expect("one record")
        .expect("folder should load");

    let outcome = sync_record(&mut record, &repo, &publisher, &PublishOptions::default())
        .await
        .expect("fresh record is a no-op");

    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert_eq!(repo.write_count(), 0);
}

#[tokio::test]
async fn new_folder_is_created_and_committed() {
    let repo = MemoryRepository::new()
        .with_file("posts/a/README.md", README)
        .with_dir("posts/a/.blogpost");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_article()
        .times(1)
        .withf(|doc| {
            doc.title == "Hello World"
                && !doc.published
                && doc.organization_id == Some(77)
                && doc.body.contains(
                    "(https://raw.githubusercontent.com/org/repo/main/posts/a/images/pic.png)",
                )
        })
        .returning(|_| Ok(article("hello-world-3k2", "1001")));
    publisher.expect_update_article().times(0);

    let config = SynchroniseConfig {
        organization_id: Some(77),
        ..post_config()
    };
    let report = synchronise(&config, &repo, &publisher).await.expect("run succeeds");

    assert_eq!(report.records.len(), 1);
    assert!(matches!(
        &report.records[0].status,
        RecordStatus::Synced(SyncOutcome::Created { slug, id }) if slug == "hello-world-3k2" && id == "1001"
    ));
    assert!(report.is_success());

    let stored = SidecarState::parse(&repo.file("posts/a/.blogpost/post.json").unwrap());
    assert_eq!(stored.readme_sha, sha_of(README));
    assert_eq!(stored.slug, "hello-world-3k2");
    assert_eq!(stored.article_id, "1001");
}

#[tokio::test]
async fn changed_readme_updates_existing_article() {
    let old = "# Hello World\n\nOld body.";
    let repo = MemoryRepository::new()
        .with_file("posts/a/README.md", README)
        .with_file("posts/a/.blogpost/post.json", &fresh_sidecar(old, "hello-world", "55"));

    let mut publisher = MockPublisher::new();
    publisher.expect_create_article().times(0);
    publisher
        .expect_update_article()
        .times(1)
        .withf(|id, doc| id == "55" && doc.title == "Hello World")
        .returning(|id, _| Ok(article("hello-world-renamed", id)));

    let report = synchronise(&post_config(), &repo, &publisher).await.unwrap();

    assert!(matches!(
        &report.records[0].status,
        RecordStatus::Synced(SyncOutcome::Updated { id, .. }) if id == "55"
    ));
    let stored = SidecarState::parse(&repo.file("posts/a/.blogpost/post.json").unwrap());
    assert_eq!(stored.readme_sha, sha_of(README));
    assert_eq!(stored.slug, "hello-world-renamed");
}

#[tokio::test]
async fn second_run_after_success_is_a_no_op() {
    let repo = MemoryRepository::new()
        .with_file("posts/a/README.md", README)
        .with_dir("posts/a/.blogpost");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_article()
        .times(1)
        .returning(|_| Ok(article("hello", "1")));

    synchronise(&post_config(), &repo, &publisher).await.unwrap();
    let second = synchronise(&post_config(), &repo, &publisher).await.unwrap();

    assert!(matches!(
        second.records[0].status,
        RecordStatus::Synced(SyncOutcome::Unchanged)
    ));
    assert_eq!(second.published(), 0);
}

#[tokio::test]
async fn remote_failure_is_isolated_and_leaves_record_stale() {
    let repo = MemoryRepository::new()
        .with_file("a/README.md", "# A\nbody")
        .with_dir("a/.blogpost")
        .with_file("b/README.md", "# B\nbody")
        .with_dir("b/.blogpost");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_article()
        .times(2)
        .returning(|doc| {
            if doc.title == "A" {
                Err(SyncError::RemoteApi {
                    status: 422,
                    body: r#"{"error":"Title has already been used"}"#.to_string(),
                })
            } else {
                Ok(article("b", "2"))
            }
        });

    let report = synchronise(&post_config(), &repo, &publisher).await.expect("run continues");

    assert_eq!(report.records.len(), 2);
    assert!(matches!(&report.records[0].status, RecordStatus::Failed(msg) if msg.contains("already been used")));
    assert!(matches!(report.records[1].status, RecordStatus::Synced(SyncOutcome::Created { .. })));
    assert_eq!(report.failed(), 1);
    assert!(!report.is_success());

    // The failed folder still has its placeholder sidecar.
    assert_eq!(repo.file("a/.blogpost/post.json").as_deref(), Some("{}"));
}

#[tokio::test]
async fn malformed_readme_aborts_run_by_default() {
    let repo = MemoryRepository::new()
        .with_file("a/README.md", "## Not a title\nbody")
        .with_dir("a/.blogpost");

    let mut publisher = MockPublisher::new();
    publisher.expect_create_article().times(0);

    let err = synchronise(&post_config(), &repo, &publisher).await.unwrap_err();

    assert!(err.is_format());
    assert!(err.to_string().contains("'a'"), "message should name the folder: {err}");
}

#[tokio::test]
async fn malformed_readme_can_be_isolated() {
    let repo = MemoryRepository::new()
        .with_file("a/README.md", "no heading at all")
        .with_dir("a/.blogpost")
        .with_file("b/README.md", "# B\nbody")
        .with_dir("b/.blogpost");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_article()
        .times(1)
        .returning(|_| Ok(article("b", "2")));

    let config = SynchroniseConfig {
        abort_on_format_error: false,
        ..post_config()
    };
    let report = synchronise(&config, &repo, &publisher).await.unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.published(), 1);
}

#[tokio::test]
async fn sidecar_conflict_is_reported_not_fatal() {
    let repo = MemoryRepository::new()
        .with_file("a/README.md", "# A\nbody")
        .with_file("a/.blogpost/post.json", "{}");

    let mut record = Discovery::new(&repo, DocFolderKind::blog_post())
        .next()
        .await
        .unwrap()
        .unwrap()
        .expect("folder should load");

    // Another run commits between our read and our write.
    repo.put("a/.blogpost/post.json", &fresh_sidecar("# A\nbody", "a", "9"));

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_article()
        .times(1)
        .returning(|_| Ok(article("a", "10")));

    let err = sync_record(&mut record, &repo, &publisher, &PublishOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(record.is_stale());
}

#[tokio::test]
async fn all_configured_kinds_are_processed() {
    let repo = MemoryRepository::new()
        .with_file("posts/p/README.md", "# Post\nx")
        .with_dir("posts/p/.blogpost")
        .with_file("series/s/README.md", "# Series\nx")
        .with_dir("series/s/.seriespage");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_article()
        .times(2)
        .returning(|doc| Ok(article(&doc.title.to_lowercase(), "1")));

    let report = synchronise(&SynchroniseConfig::default(), &repo, &publisher)
        .await
        .unwrap();

    let kinds: Vec<_> = report.records.iter().map(|r| (r.kind.as_str(), r.location.as_str())).collect();
    assert_eq!(kinds, vec![("post", "posts/p"), ("series", "series/s")]);
    assert!(repo.file("posts/p/.blogpost/post.json").is_some());
    assert!(repo.file("series/s/.seriespage/series.json").is_some());
}

#[tokio::test]
async fn undecodable_readme_fails_only_its_folder() {
    let repo = MemoryRepository::new()
        .with_corrupt_file("a/README.md")
        .with_dir("a/.blogpost")
        .with_file("b/README.md", "# B\nbody")
        .with_dir("b/.blogpost");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_article()
        .times(1)
        .withf(|doc| doc.title == "B")
        .returning(|_| Ok(article("b", "2")));

    let report = synchronise(&post_config(), &repo, &publisher)
        .await
        .expect("run continues past the unreadable folder");

    assert!(report.discovery_errors.is_empty());
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].location, "a");
    assert!(matches!(&report.records[0].status, RecordStatus::Failed(msg) if msg.contains("a/README.md")));
    assert!(matches!(report.records[1].status, RecordStatus::Synced(SyncOutcome::Created { .. })));
    assert_eq!(report.published(), 1);
    assert!(!report.is_success());
}

#[tokio::test]
async fn sidecar_create_race_is_a_conflict_and_siblings_continue() {
    let repo = MemoryRepository::new()
        .with_file("a/README.md", "# A\nbody")
        .with_dir("a/.blogpost")
        .with_create_race("a/.blogpost/post.json")
        .with_file("b/README.md", "# B\nbody")
        .with_dir("b/.blogpost");

    let mut publisher = MockPublisher::new();
    publisher
        .expect_create_article()
        .times(1)
        .withf(|doc| doc.title == "B")
        .returning(|_| Ok(article("b", "2")));

    let report = synchronise(&post_config(), &repo, &publisher).await.unwrap();

    assert_eq!(report.records.len(), 2);
    assert!(matches!(report.records[0].status, RecordStatus::Conflict(_)));
    assert_eq!(report.conflicts(), 1);
    assert_eq!(report.published(), 1);
    assert!(report.is_success());
}
