//! Chunk streaming along the travel axis.
//!
//! The streamer keeps a contiguous run of fixed-length chunks ahead of the
//! player. New chunks are prepended at the front (more negative Z) once the
//! player comes within the trigger distance of the frontmost chunk, and the
//! rearmost chunks are released once the window exceeds its slack.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use throttle_common::{require_non_negative, require_positive, ConfigError};
use tracing::{debug, warn};

use crate::chunk::{SegmentBuilder, WorldChunk};

/// Default chunk length in world units.
pub const DEFAULT_CHUNK_LENGTH: f32 = 100.0;

/// Default number of chunks kept beyond the target before rear trimming.
pub const DEFAULT_BUFFER_SLACK: usize = 2;

/// Streamer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    /// Length of every chunk
    pub chunk_length: f32,
    /// Number of chunks the window aims to hold
    pub target_chunks: usize,
    /// Extra chunks tolerated before the rear is trimmed
    pub buffer_slack: usize,
    /// How many chunk lengths before the front edge generation triggers
    pub trigger_distance_factor: f32,
    /// Fewest chunks created per generation pass
    pub min_batch: usize,
    /// Most chunks created per generation pass
    pub max_batch: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            chunk_length: DEFAULT_CHUNK_LENGTH,
            target_chunks: 10,
            buffer_slack: DEFAULT_BUFFER_SLACK,
            trigger_distance_factor: 3.0,
            min_batch: 3,
            max_batch: 5,
        }
    }
}

impl StreamerConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("chunk_length", self.chunk_length)?;
        require_non_negative("trigger_distance_factor", self.trigger_distance_factor)?;
        if self.target_chunks == 0 {
            return Err(ConfigError::invalid("target_chunks", "must be at least 1"));
        }
        if self.min_batch == 0 || self.max_batch < self.min_batch {
            return Err(ConfigError::invalid(
                "max_batch",
                format!(
                    "batch bounds must satisfy 1 <= min ({}) <= max ({})",
                    self.min_batch, self.max_batch
                ),
            ));
        }
        Ok(())
    }
}

/// Chunks created and released by one streamer pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDelta {
    /// Positions of newly created chunks, front-most last
    pub created: Vec<f32>,
    /// Positions of released chunks
    pub released: Vec<f32>,
    /// Whether the window had to be rebuilt from scratch
    pub rebuilt: bool,
}

impl StreamDelta {
    /// Returns whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.released.is_empty() && !self.rebuilt
    }

    /// Folds another delta into this one.
    pub fn merge(&mut self, other: StreamDelta) {
        self.created.extend(other.created);
        self.released.extend(other.released);
        self.rebuilt |= other.rebuilt;
    }
}

/// Maintains a sliding window of chunks along the travel axis.
#[derive(Debug)]
pub struct ChunkStreamer<B: SegmentBuilder> {
    /// Configuration
    config: StreamerConfig,
    /// Builds segment content for new chunks
    builder: B,
    /// Active chunks, frontmost (smallest index) first
    chunks: VecDeque<WorldChunk<B::Segment>>,
    /// Total chunks built since the last reset
    chunks_created: u64,
    /// Total chunks released since the last reset
    chunks_released: u64,
}

impl<B: SegmentBuilder> ChunkStreamer<B> {
    /// Creates a streamer and builds the initial window at the origin.
    pub fn new(config: StreamerConfig, builder: B) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut streamer = Self {
            chunks: VecDeque::with_capacity(config.target_chunks + config.max_batch),
            config,
            builder,
            chunks_created: 0,
            chunks_released: 0,
        };
        let mut delta = StreamDelta::default();
        streamer.build_window(0, &mut delta);
        Ok(streamer)
    }

    /// Advances the window for a player at `player_z`.
    pub fn advance(&mut self, player_z: f32) -> StreamDelta {
        let mut delta = StreamDelta::default();
        let length = self.config.chunk_length;

        if self.chunks.is_empty() {
            warn!("Chunk window empty, rebuilding around z={player_z:.1}");
            self.build_window(self.anchor_index(player_z), &mut delta);
            delta.rebuilt = true;
        }

        self.chunks.make_contiguous().sort_by_key(WorldChunk::index);

        let Some(front_index) = self.chunks.front().map(WorldChunk::index) else {
            return delta;
        };
        let front_position = front_index as f32 * length;
        let trigger_point = front_position + length * self.config.trigger_distance_factor;

        if player_z < trigger_point || self.chunks.len() < self.config.target_chunks {
            let missing = self.config.target_chunks.saturating_sub(self.chunks.len());
            let count = missing
                .max(self.config.min_batch)
                .min(self.config.max_batch);
            for step in 1..=count {
                let index = front_index - step as i64;
                self.push_front(index);
                delta.created.push(index as f32 * length);
            }
            debug!(
                "Created {count} chunks ahead, player at z={player_z:.1}, front now z={:.1}",
                (front_index - count as i64) as f32 * length
            );
        }

        let limit = self.config.target_chunks + self.config.buffer_slack;
        while self.chunks.len() > limit {
            if let Some(chunk) = self.chunks.pop_back() {
                debug!("Releasing chunk at z={:.1}", chunk.position());
                delta.released.push(chunk.position());
                self.chunks_released += 1;
            }
        }

        delta
    }

    /// Rebuilds the initial window at the origin and zeroes counters.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.chunks_created = 0;
        self.chunks_released = 0;
        let mut delta = StreamDelta::default();
        self.build_window(0, &mut delta);
    }

    /// Drops every chunk without rebuilding.
    pub fn clear(&mut self) {
        self.chunks_released += self.chunks.len() as u64;
        self.chunks.clear();
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Returns the number of active chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns whether no chunk is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Active chunk positions, ascending (frontmost first).
    #[must_use]
    pub fn positions(&self) -> Vec<f32> {
        self.chunks.iter().map(WorldChunk::position).collect()
    }

    /// Frontmost chunk (most negative position).
    #[must_use]
    pub fn frontmost(&self) -> Option<&WorldChunk<B::Segment>> {
        self.chunks.front()
    }

    /// Rearmost chunk (largest position).
    #[must_use]
    pub fn rearmost(&self) -> Option<&WorldChunk<B::Segment>> {
        self.chunks.back()
    }

    /// Iterates active chunks, frontmost first.
    pub fn chunks(&self) -> impl Iterator<Item = &WorldChunk<B::Segment>> {
        self.chunks.iter()
    }

    /// Returns whether a chunk exists at `position`.
    #[must_use]
    pub fn contains(&self, position: f32) -> bool {
        let index = (position / self.config.chunk_length).round() as i64;
        self.chunks.iter().any(|c| c.index() == index)
    }

    /// Returns the chunk whose band contains `z`.
    #[must_use]
    pub fn chunk_at(&self, z: f32) -> Option<&WorldChunk<B::Segment>> {
        self.chunks.iter().find(|c| c.contains_z(z))
    }

    /// Total chunks created since the last reset.
    #[must_use]
    pub const fn chunks_created(&self) -> u64 {
        self.chunks_created
    }

    /// Total chunks released since the last reset.
    #[must_use]
    pub const fn chunks_released(&self) -> u64 {
        self.chunks_released
    }

    /// Index of the chunk whose band contains `z`.
    fn anchor_index(&self, z: f32) -> i64 {
        (z / self.config.chunk_length).ceil() as i64
    }

    fn build_window(&mut self, anchor: i64, delta: &mut StreamDelta) {
        let length = self.config.chunk_length;
        for step in 0..self.config.target_chunks as i64 {
            let index = anchor - step;
            self.push_back(index);
            delta.created.push(index as f32 * length);
        }
        debug!(
            "Built window of {} chunks from z={:.1}",
            self.chunks.len(),
            anchor as f32 * length
        );
    }

    fn push_front(&mut self, index: i64) {
        let segment = self.builder.build(index, self.config.chunk_length);
        self.chunks
            .push_front(WorldChunk::new(index, self.config.chunk_length, segment));
        self.chunks_created += 1;
    }

    fn push_back(&mut self, index: i64) {
        let segment = self.builder.build(index, self.config.chunk_length);
        self.chunks
            .push_back(WorldChunk::new(index, self.config.chunk_length, segment));
        self.chunks_created += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Builder that records nothing.
    struct Unit;

    impl SegmentBuilder for Unit {
        type Segment = ();

        fn build(&mut self, _index: i64, _length: f32) {}
    }

    fn streamer(target: usize, factor: f32) -> ChunkStreamer<Unit> {
        let config = StreamerConfig {
            target_chunks: target,
            trigger_distance_factor: factor,
            ..Default::default()
        };
        ChunkStreamer::new(config, Unit).expect("valid config")
    }

    fn assert_contiguous(streamer: &ChunkStreamer<Unit>) {
        let indices: Vec<i64> = streamer.chunks().map(WorldChunk::index).collect();
        for pair in indices.windows(2) {
            assert_eq!(pair[1], pair[0] + 1, "gap or duplicate in {indices:?}");
        }
    }

    #[test]
    fn test_initial_window() {
        let s = streamer(10, 3.0);
        assert_eq!(s.len(), 10);
        assert_eq!(s.rearmost().map(WorldChunk::position), Some(0.0));
        assert_eq!(s.frontmost().map(WorldChunk::position), Some(-900.0));
        assert_contiguous(&s);
    }

    #[test]
    fn test_no_generation_far_from_front() {
        let mut s = streamer(10, 3.0);
        let delta = s.advance(0.0);
        assert!(delta.is_empty());
        assert_eq!(s.len(), 10);
    }

    #[test]
    fn test_generation_near_front() {
        let mut s = streamer(10, 3.0);
        // Front at -900, trigger at -600.
        let delta = s.advance(-650.0);
        assert_eq!(delta.created, vec![-1000.0, -1100.0, -1200.0]);
        assert_eq!(delta.released, vec![0.0]);
        assert_eq!(s.len(), 12);
        assert_eq!(s.frontmost().map(WorldChunk::position), Some(-1200.0));
        assert_contiguous(&s);
    }

    #[test]
    fn test_empty_window_self_heals() {
        let mut s = streamer(10, 3.0);
        s.clear();
        assert!(s.is_empty());

        let delta = s.advance(-5_050.0);
        assert!(delta.rebuilt);
        assert!(s.len() >= 10);
        assert!(s.chunk_at(-5_050.0).is_some());
        assert_contiguous(&s);
    }

    #[test]
    fn test_reset_restores_origin() {
        let mut s = streamer(5, 1.0);
        for step in 0..50 {
            s.advance(-100.0 * step as f32);
        }
        s.reset();
        assert_eq!(s.len(), 5);
        assert_eq!(s.rearmost().map(WorldChunk::position), Some(0.0));
        assert_eq!(s.chunks_created(), 5);
    }

    #[test]
    fn test_rejects_bad_config() {
        let config = StreamerConfig {
            chunk_length: 0.0,
            ..Default::default()
        };
        assert!(ChunkStreamer::new(config, Unit).is_err());
    }

    proptest! {
        #[test]
        fn prop_window_stays_contiguous(steps in proptest::collection::vec(0.0f32..60.0, 1..200)) {
            let mut s = streamer(8, 2.0);
            let mut z = 0.0f32;
            for step in steps {
                z -= step;
                s.advance(z);
                let len = s.len();
                prop_assert!(len >= 8 && len <= 10, "window size {} out of bounds", len);
                let indices: Vec<i64> = s.chunks().map(WorldChunk::index).collect();
                for pair in indices.windows(2) {
                    prop_assert_eq!(pair[1], pair[0] + 1);
                }
                let front = s.frontmost().map_or(0.0, WorldChunk::position);
                prop_assert!(front < z, "player at {} passed the front at {}", z, front);
            }
        }
    }
}
