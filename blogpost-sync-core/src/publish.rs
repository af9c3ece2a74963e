//! Per-record sync step: README → article → platform → sidecar commit.

use tracing::info;

use crate::contract::{Publisher, Repository};
use crate::error::SyncError;
use crate::payload::{build_article, PayloadContext};
use crate::record::PublishRecord;

/// Options shared by every record in a run.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub organization_id: Option<i64>,
    pub cover_image: bool,
}

/// What [`sync_record`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// README unchanged since the last sync.
    Unchanged,
    Created { slug: String, id: String },
    Updated { slug: String, id: String },
}

/// Bring one record's remote article in line with its README.
///
/// Fresh records are left alone. Otherwise the article is created or updated
/// and the sidecar committed. On any error the sidecar is left as it was, so
/// the next run starts this record over.
pub async fn sync_record<R, P>(
    record: &mut PublishRecord,
    repo: &R,
    publisher: &P,
    options: &PublishOptions,
) -> Result<SyncOutcome, SyncError>
where
    R: Repository + ?Sized,
    P: Publisher + ?Sized,
{
    if !record.is_stale() {
        return Ok(SyncOutcome::Unchanged);
    }

    let ctx = PayloadContext {
        base_url: repo.content_base_url(record.location())?,
        organization_id: options.organization_id,
        cover_image: options.cover_image,
    };
    let article = build_article(record.readme(), &ctx).map_err(|source| SyncError::Format {
        folder: record.location().to_string(),
        source,
    })?;

    let existing = record.is_published();
    let published = if existing {
        info!(location = %record.location(), article_id = %record.remote_id(), "[PUBLISH] Updating article");
        publisher.update_article(record.remote_id(), &article).await?
    } else {
        info!(location = %record.location(), title = %article.title, "[PUBLISH] Creating article");
        publisher.create_article(&article).await?
    };

    record.mark_published(published.slug.clone(), published.id.clone());
    record.commit(repo).await?;

    let outcome = if existing {
        SyncOutcome::Updated {
            slug: published.slug,
            id: published.id,
        }
    } else {
        SyncOutcome::Created {
            slug: published.slug,
            id: published.id,
        }
    };
    info!(location = %record.location(), ?outcome, "[PUBLISH] Record synchronised");
    Ok(outcome)
}
