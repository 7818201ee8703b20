//! Child-association engine
//!
//! Child lists live under a parent item (`job_templates/5/labels/`). A child is
//! bound by POSTing `{"id": N}` and released by POSTing
//! `{"id": N, "disassociate": true}`; both answer 204.

use awx_client::{ApiClient, ApiResult, Dialect, Method, envelope};
use log::{debug, info};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// A child list bound to a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Attribute holding the child ids
    pub attribute: &'static str,
    /// Child collection under the parent item
    pub collection: &'static str,
    /// Whether the server-side order of the children is observable
    pub ordered: bool,
}

impl Binding {
    pub const fn unordered(attribute: &'static str, collection: &'static str) -> Self {
        Self {
            attribute,
            collection,
            ordered: false,
        }
    }

    pub const fn ordered(attribute: &'static str, collection: &'static str) -> Self {
        Self {
            attribute,
            collection,
            ordered: true,
        }
    }

    /// Path of the child list under `parent` (an item path ending in `/`)
    pub fn path(&self, parent: &str) -> String {
        format!("{}{}/", parent, self.collection)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Associate(i64),
    Disassociate(i64),
}

/// Calls needed to move a child list from `observed` to `desired`
///
/// Unordered lists change by symmetric difference: releases first, then new
/// bindings. Ordered lists whose order differs are released entirely and
/// rebound in the desired sequence.
pub fn plan_update(binding: &Binding, observed: &[i64], desired: &[i64]) -> Vec<Step> {
    let desired = dedup(desired);
    if binding.ordered {
        if observed == desired.as_slice() {
            return Vec::new();
        }
        return observed
            .iter()
            .map(|id| Step::Disassociate(*id))
            .chain(desired.iter().map(|id| Step::Associate(*id)))
            .collect();
    }

    let removals = observed
        .iter()
        .filter(|id| !desired.contains(id))
        .map(|id| Step::Disassociate(*id));
    let additions = desired
        .iter()
        .filter(|id| !observed.contains(id))
        .map(|id| Step::Associate(*id));
    removals.chain(additions).collect()
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    seen
}

/// Runs association calls for one parent
pub struct Associations<'a> {
    client: &'a ApiClient,
    dialect: Dialect,
}

impl<'a> Associations<'a> {
    pub fn new(client: &'a ApiClient, dialect: Dialect) -> Self {
        Self { client, dialect }
    }

    pub async fn associate(
        &self,
        ctx: &CancellationToken,
        parent: &str,
        binding: &Binding,
        child: i64,
    ) -> ApiResult<()> {
        debug!("associate {} with {}{}", child, parent, binding.collection);
        self.client
            .request(
                ctx,
                Method::POST,
                &binding.path(parent),
                Some(&json!({ "id": child })),
                &[204],
                self.dialect,
            )
            .await
            .map(|_| ())
    }

    pub async fn disassociate(
        &self,
        ctx: &CancellationToken,
        parent: &str,
        binding: &Binding,
        child: i64,
    ) -> ApiResult<()> {
        debug!("disassociate {} from {}{}", child, parent, binding.collection);
        self.client
            .request(
                ctx,
                Method::POST,
                &binding.path(parent),
                Some(&json!({ "id": child, "disassociate": true })),
                &[204],
                self.dialect,
            )
            .await
            .map(|_| ())
    }

    /// Child ids in server order
    pub async fn read(
        &self,
        ctx: &CancellationToken,
        parent: &str,
        binding: &Binding,
    ) -> ApiResult<Vec<i64>> {
        let rows = self
            .client
            .list_all(ctx, &binding.path(parent), self.dialect)
            .await?;
        Ok(rows.iter().filter_map(envelope::record_id).collect())
    }

    async fn apply(
        &self,
        ctx: &CancellationToken,
        parent: &str,
        binding: &Binding,
        steps: &[Step],
    ) -> ApiResult<()> {
        if !steps.is_empty() {
            info!(
                "{}{}: {} association change(s)",
                parent,
                binding.collection,
                steps.len()
            );
        }
        for step in steps {
            match step {
                Step::Associate(id) => self.associate(ctx, parent, binding, *id).await?,
                Step::Disassociate(id) => self.disassociate(ctx, parent, binding, *id).await?,
            }
        }
        Ok(())
    }

    /// Bind every desired child, in order
    pub async fn create(
        &self,
        ctx: &CancellationToken,
        parent: &str,
        binding: &Binding,
        desired: &[i64],
    ) -> ApiResult<()> {
        let steps: Vec<Step> = dedup(desired).into_iter().map(Step::Associate).collect();
        self.apply(ctx, parent, binding, &steps).await
    }

    /// Move the child list from what the server reports to `desired`
    pub async fn update(
        &self,
        ctx: &CancellationToken,
        parent: &str,
        binding: &Binding,
        desired: &[i64],
    ) -> ApiResult<()> {
        let observed = self.read(ctx, parent, binding).await?;
        let steps = plan_update(binding, &observed, desired);
        self.apply(ctx, parent, binding, &steps).await
    }

    /// Release every child bound according to state
    pub async fn delete(
        &self,
        ctx: &CancellationToken,
        parent: &str,
        binding: &Binding,
        bound: &[i64],
    ) -> ApiResult<()> {
        let steps: Vec<Step> = dedup(bound).into_iter().map(Step::Disassociate).collect();
        self.apply(ctx, parent, binding, &steps).await
    }
}
