pub mod interner;
pub mod target;

pub use interner::Interner;
pub use target::{render_table, TargetDataset};

use crate::algorithms::initializer::LatentInitializer;
use crate::error::{CfError, EntityKind, Result};
use crate::models::*;
use crate::utils::validation;
use nalgebra::DVector;
use rand::rngs::StdRng;
use tracing::{debug, info, trace};

pub const DEFAULT_DIMENSION: usize = 2;

#[derive(Debug, Clone)]
enum Records {
    /// Latent vectors plus the observations gradient descent needs.
    Trainable {
        users: Vec<TrainableRecord>,
        items: Vec<TrainableRecord>,
    },
    /// Latent vectors only; reached through `cleanup` or `import`.
    Servable {
        users: Vec<DVector<f64>>,
        items: Vec<DVector<f64>>,
    },
}

/// Sparse rating index owning one latent vector per user and per item.
///
/// Users and items are stored densely in first-seen order; the interners
/// translate raw identifiers to positions.
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    initializer: LatentInitializer,
    users: Interner,
    items: Interner,
    records: Records,
}

impl Default for TrainingDataset {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl TrainingDataset {
    /// Creates a dataset whose latent vectors are seeded from OS entropy.
    /// A `dimension` of zero selects [`DEFAULT_DIMENSION`].
    pub fn new(dimension: usize) -> Self {
        Self::from_initializer(LatentInitializer::from_entropy(effective(dimension)))
    }

    pub fn with_seed(dimension: usize, seed: u64) -> Self {
        Self::from_initializer(LatentInitializer::from_seed(seed, effective(dimension)))
    }

    pub fn with_rng(dimension: usize, rng: StdRng) -> Self {
        Self::from_initializer(LatentInitializer::new(rng, effective(dimension)))
    }

    fn from_initializer(initializer: LatentInitializer) -> Self {
        Self {
            initializer,
            users: Interner::new(),
            items: Interner::new(),
            records: Records::Trainable {
                users: Vec::new(),
                items: Vec::new(),
            },
        }
    }

    pub fn dimension(&self) -> usize {
        self.initializer.dimension()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.items.is_empty()
    }

    /// True once observations have been discarded by `cleanup` or `import`.
    pub fn is_cleaned_up(&self) -> bool {
        matches!(self.records, Records::Servable { .. })
    }

    /// Records one observation. Duplicate (user, item) pairs are kept as
    /// independent observations.
    pub fn add(&mut self, user: &str, item: &str, rating: f64) -> Result<()> {
        let (users, items) = match &mut self.records {
            Records::Trainable { users, items } => (users, items),
            Records::Servable { .. } => {
                return Err(CfError::InvalidState(
                    "cannot add ratings to a dataset whose observations were discarded".into(),
                ))
            }
        };

        let user_idx = self.users.index_of(user);
        if user_idx == users.len() {
            trace!(user, "creating user latent vector");
            users.push(TrainableRecord::new(self.initializer.next_vector()));
        }

        let item_idx = self.items.index_of(item);
        if item_idx == items.len() {
            trace!(item, "creating item latent vector");
            items.push(TrainableRecord::new(self.initializer.next_vector()));
        }

        users[user_idx].observations.push(item_idx, rating);
        items[item_idx].observations.push(user_idx, rating);
        Ok(())
    }

    pub fn add_rating(&mut self, rating: &Rating) -> Result<()> {
        self.add(&rating.user, &rating.item, rating.rating)
    }

    pub fn contains_user(&self, user: &str) -> bool {
        self.users.get(user).is_some()
    }

    pub fn contains_item(&self, item: &str) -> bool {
        self.items.get(item).is_some()
    }

    pub fn user_vector(&self, user: &str) -> Result<&DVector<f64>> {
        let idx = self
            .users
            .get(user)
            .ok_or_else(|| CfError::unknown_user(user))?;
        Ok(self.user_at(idx))
    }

    pub fn item_vector(&self, item: &str) -> Result<&DVector<f64>> {
        let idx = self
            .items
            .get(item)
            .ok_or_else(|| CfError::unknown_item(item))?;
        Ok(self.item_at(idx))
    }

    /// Every user with its latent vector, in first-seen order.
    pub fn users(&self) -> impl Iterator<Item = (&str, &DVector<f64>)> + '_ {
        self.users
            .keys()
            .iter()
            .enumerate()
            .map(move |(idx, key)| (key.as_str(), self.user_at(idx)))
    }

    /// Every item with its latent vector, in first-seen order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &DVector<f64>)> + '_ {
        self.items
            .keys()
            .iter()
            .enumerate()
            .map(move |(idx, key)| (key.as_str(), self.item_at(idx)))
    }

    /// Latent vectors of the given users, in the order requested.
    pub fn user_vectors(&self, indices: &[usize]) -> Result<Vec<&DVector<f64>>> {
        indices
            .iter()
            .map(|&idx| {
                self.users.key_of(idx)?;
                Ok(self.user_at(idx))
            })
            .collect()
    }

    /// Latent vectors of the given items, in the order requested.
    pub fn item_vectors(&self, indices: &[usize]) -> Result<Vec<&DVector<f64>>> {
        indices
            .iter()
            .map(|&idx| {
                self.items.key_of(idx)?;
                Ok(self.item_at(idx))
            })
            .collect()
    }

    /// Observations recorded for `user`; `None` after cleanup or for unknown users.
    pub fn user_observations(&self, user: &str) -> Option<&Observations> {
        match &self.records {
            Records::Trainable { users, .. } => {
                self.users.get(user).map(|idx| &users[idx].observations)
            }
            Records::Servable { .. } => None,
        }
    }

    /// Observations recorded for `item`; `None` after cleanup or for unknown items.
    pub fn item_observations(&self, item: &str) -> Option<&Observations> {
        match &self.records {
            Records::Trainable { items, .. } => {
                self.items.get(item).map(|idx| &items[idx].observations)
            }
            Records::Servable { .. } => None,
        }
    }

    fn user_at(&self, idx: usize) -> &DVector<f64> {
        match &self.records {
            Records::Trainable { users, .. } => &users[idx].latent,
            Records::Servable { users, .. } => &users[idx],
        }
    }

    fn item_at(&self, idx: usize) -> &DVector<f64> {
        match &self.records {
            Records::Trainable { items, .. } => &items[idx].latent,
            Records::Servable { items, .. } => &items[idx],
        }
    }

    pub(crate) fn trainable_mut(
        &mut self,
    ) -> Result<(&mut [TrainableRecord], &mut [TrainableRecord])> {
        match &mut self.records {
            Records::Trainable { users, items } => Ok((users, items)),
            Records::Servable { .. } => Err(discarded()),
        }
    }

    /// Discards observations, keeping only latent vectors. Idempotent.
    pub fn cleanup(&mut self) {
        let records = std::mem::replace(
            &mut self.records,
            Records::Servable {
                users: Vec::new(),
                items: Vec::new(),
            },
        );

        self.records = match records {
            Records::Trainable { users, items } => {
                debug!(
                    users = users.len(),
                    items = items.len(),
                    "discarding training observations"
                );
                Records::Servable {
                    users: users.into_iter().map(|r| r.latent).collect(),
                    items: items.into_iter().map(|r| r.latent).collect(),
                }
            }
            servable => servable,
        };
    }

    /// Fails with [`CfError::NonFinite`] on the first latent vector holding a
    /// NaN or infinite component, users before items.
    pub fn ensure_finite(&self) -> Result<()> {
        let non_finite = |(_, v): &(&str, &DVector<f64>)| v.iter().any(|c| !c.is_finite());
        let found = self
            .users()
            .find(non_finite)
            .map(|(id, _)| (EntityKind::User, id))
            .or_else(|| {
                self.items()
                    .find(non_finite)
                    .map(|(id, _)| (EntityKind::Item, id))
            });

        match found {
            Some((kind, id)) => Err(CfError::NonFinite {
                kind,
                id: id.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Cleans up, then exports latent vectors keyed by identifier.
    /// Non-finite vectors are rejected since JSON cannot carry them.
    pub fn export(&mut self) -> Result<Snapshot> {
        self.cleanup();
        self.ensure_finite()?;
        Ok(Snapshot {
            theta: self
                .users()
                .map(|(id, v)| (id.to_string(), UserFactors { theta: to_vec(v) }))
                .collect(),
            x: self
                .items()
                .map(|(id, v)| (id.to_string(), ItemFactors { x: to_vec(v) }))
                .collect(),
        })
    }

    /// Cleans up, then exports latent vectors keyed by dense index together
    /// with the identifier tables.
    pub fn export_indexed(&mut self) -> Result<IndexedSnapshot> {
        self.cleanup();
        self.ensure_finite()?;
        Ok(IndexedSnapshot {
            theta: self
                .users()
                .enumerate()
                .map(|(idx, (_, v))| (idx.to_string(), UserFactors { theta: to_vec(v) }))
                .collect(),
            x: self
                .items()
                .enumerate()
                .map(|(idx, (_, v))| (idx.to_string(), ItemFactors { x: to_vec(v) }))
                .collect(),
            meta: SnapshotMeta {
                users: self.users.keys().to_vec(),
                items: self.items.keys().to_vec(),
            },
        })
    }

    /// Replaces all latent state with `snapshot`. The dataset is left
    /// predict-only; it is untouched if the snapshot is rejected.
    pub fn import(&mut self, snapshot: Snapshot) -> Result<()> {
        let dimension = self.dimension();
        let (user_table, user_vectors) = import_keyed(
            snapshot.theta.iter().map(|(id, f)| (id, f.theta.as_slice())),
            dimension,
        )?;
        let (item_table, item_vectors) = import_keyed(
            snapshot.x.iter().map(|(id, f)| (id, f.x.as_slice())),
            dimension,
        )?;

        self.install(user_table, item_table, user_vectors, item_vectors);
        Ok(())
    }

    /// Index-keyed counterpart of [`TrainingDataset::import`].
    pub fn import_indexed(&mut self, snapshot: IndexedSnapshot) -> Result<()> {
        let dimension = self.dimension();
        let mut user_table = Interner::new();
        user_table.import(snapshot.meta.users)?;
        let mut item_table = Interner::new();
        item_table.import(snapshot.meta.items)?;

        let user_vectors = import_indexed_side(
            "user",
            &user_table,
            snapshot.theta.iter().map(|(k, f)| (k, f.theta.as_slice())),
            dimension,
        )?;
        let item_vectors = import_indexed_side(
            "item",
            &item_table,
            snapshot.x.iter().map(|(k, f)| (k, f.x.as_slice())),
            dimension,
        )?;

        self.install(user_table, item_table, user_vectors, item_vectors);
        Ok(())
    }

    pub fn import_file(&mut self, snapshot: SnapshotFile) -> Result<()> {
        match snapshot {
            SnapshotFile::Keyed(snapshot) => self.import(snapshot),
            SnapshotFile::Indexed(snapshot) => self.import_indexed(snapshot),
        }
    }

    fn install(
        &mut self,
        users: Interner,
        items: Interner,
        user_vectors: Vec<DVector<f64>>,
        item_vectors: Vec<DVector<f64>>,
    ) {
        info!(
            users = user_vectors.len(),
            items = item_vectors.len(),
            dimension = self.dimension(),
            "imported latent snapshot"
        );
        self.users = users;
        self.items = items;
        self.records = Records::Servable {
            users: user_vectors,
            items: item_vectors,
        };
    }
}

fn effective(dimension: usize) -> usize {
    if dimension == 0 {
        DEFAULT_DIMENSION
    } else {
        dimension
    }
}

fn discarded() -> CfError {
    CfError::InvalidState("training observations were discarded by cleanup or import".into())
}

fn to_vec(v: &DVector<f64>) -> Vec<f64> {
    v.as_slice().to_vec()
}

fn import_keyed<'a>(
    entries: impl Iterator<Item = (&'a String, &'a [f64])>,
    dimension: usize,
) -> Result<(Interner, Vec<DVector<f64>>)> {
    let mut table = Interner::new();
    let mut vectors = Vec::new();
    for (id, values) in entries {
        vectors.push(validation::validate_latent(id, values, dimension)?);
        table.index_of(id);
    }
    Ok((table, vectors))
}

fn import_indexed_side<'a>(
    side: &str,
    table: &Interner,
    entries: impl Iterator<Item = (&'a String, &'a [f64])>,
    dimension: usize,
) -> Result<Vec<DVector<f64>>> {
    let mut slots: Vec<Option<DVector<f64>>> = vec![None; table.len()];
    for (key, values) in entries {
        let idx = validation::validate_index(key, table.len())?;
        if slots[idx].is_some() {
            return Err(CfError::MalformedSnapshot(format!(
                "{} index {} appears more than once",
                side, idx
            )));
        }
        let id = table.key_of(idx)?;
        slots[idx] = Some(validation::validate_latent(id, values, dimension)?);
    }
    validation::collect_slots(side, slots)
}
