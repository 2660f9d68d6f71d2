//! Catalog upsert for a single winning offer.
//!
//! Lookup → Create | Update | Unchanged. The image is split off the offer
//! and stored before the catalog write; what happens when that fails is
//! governed by [`ImagePolicy`].

use cellar_core::{
    CatalogFields, CatalogRecord, CatalogStore, ImagePolicy, Lookup, RawOffer, StoreError,
};
use thiserror::Error;

use crate::image::{ImageError, ImageOutcome, ImageSink};
use crate::report::FailureKind;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("image for upc {upc} rejected: {source}")]
    Image {
        upc: String,
        #[source]
        source: ImageError,
    },

    #[error("catalog write for upc {upc} failed: {source}")]
    Catalog {
        upc: String,
        #[source]
        source: StoreError,
        /// Image rejected under [`ImagePolicy::SkipImage`] before the write failed.
        image: Option<ImageError>,
    },
}

impl ReconcileError {
    #[must_use]
    pub fn upc(&self) -> &str {
        match self {
            ReconcileError::Image { upc, .. } | ReconcileError::Catalog { upc, .. } => upc,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            ReconcileError::Image { source, .. } => source.kind(),
            ReconcileError::Catalog { .. } => FailureKind::CatalogWriteFailure,
        }
    }

    /// An image failure that accompanied a catalog failure, if any.
    #[must_use]
    pub fn image_failure(&self) -> Option<&ImageError> {
        match self {
            ReconcileError::Catalog { image, .. } => image.as_ref(),
            ReconcileError::Image { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogAction {
    Created,
    Updated,
    /// Stored fields already matched the offer; no write was issued.
    Unchanged,
}

/// Result of reconciling one offer.
#[derive(Debug)]
pub struct Reconciled {
    pub record: CatalogRecord,
    pub action: CatalogAction,
    /// `Err` only under [`ImagePolicy::SkipImage`]: the record was written
    /// without its image.
    pub image: Result<ImageOutcome, ImageError>,
}

pub struct Reconciler<S> {
    store: S,
    images: ImageSink,
    policy: ImagePolicy,
}

impl<S: CatalogStore> Reconciler<S> {
    #[must_use]
    pub fn new(store: S, images: ImageSink, policy: ImagePolicy) -> Self {
        Self {
            store,
            images,
            policy,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upserts `offer` into the catalog, keyed by UPC.
    ///
    /// Existing records are overwritten field by field. Reconciling the same
    /// offer twice yields the same record and no second write.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Catalog`]: lookup or write failed.
    /// - [`ReconcileError::Image`]: the image could not be stored and the
    ///   policy is [`ImagePolicy::SkipOffer`].
    pub async fn reconcile(&self, offer: RawOffer) -> Result<Reconciled, ReconcileError> {
        let (fields, payload) = offer.into_parts();
        let upc = fields.upc.clone();
        let existing = self
            .store
            .lookup(&upc)
            .await
            .map_err(|source| ReconcileError::Catalog {
                upc: upc.clone(),
                source,
                image: None,
            })?;

        let image = match self.images.store(&upc, payload.as_deref()).await {
            Ok(outcome) => Ok(outcome),
            Err(source) if self.policy == ImagePolicy::SkipOffer => {
                tracing::warn!(upc = %upc, error = %source, "image rejected; skipping offer");
                return Err(ReconcileError::Image {
                    upc: upc.clone(),
                    source,
                });
            }
            Err(err) => {
                tracing::warn!(upc = %upc, error = %err, "image rejected; writing record without it");
                Err(err)
            }
        };

        let (record, action) = match self.write(existing, &fields).await {
            Ok(written) => written,
            Err(source) => {
                return Err(ReconcileError::Catalog {
                    upc,
                    source,
                    image: image.err(),
                });
            }
        };
        tracing::debug!(upc = %upc, id = record.id, ?action, "reconciled");

        Ok(Reconciled {
            record,
            action,
            image,
        })
    }

    async fn write(
        &self,
        existing: Lookup,
        fields: &CatalogFields,
    ) -> Result<(CatalogRecord, CatalogAction), StoreError> {
        match existing {
            Lookup::Found(record) if record.fields == *fields => {
                Ok((record, CatalogAction::Unchanged))
            }
            Lookup::Found(record) => {
                let updated = self.store.update(record.id, fields).await?;
                Ok((updated, CatalogAction::Updated))
            }
            Lookup::NotFound => match self.store.create(fields).await {
                Ok(created) => Ok((created, CatalogAction::Created)),
                // Another writer inserted the key after our lookup; fall back to an update.
                Err(StoreError::DuplicateKey { .. }) => match self.store.lookup(&fields.upc).await? {
                    Lookup::Found(record) if record.fields == *fields => {
                        Ok((record, CatalogAction::Unchanged))
                    }
                    Lookup::Found(record) => {
                        let updated = self.store.update(record.id, fields).await?;
                        Ok((updated, CatalogAction::Updated))
                    }
                    Lookup::NotFound => Err(StoreError::DuplicateKey {
                        upc: fields.upc.clone(),
                    }),
                },
                Err(err) => Err(err),
            },
        }
    }
}
