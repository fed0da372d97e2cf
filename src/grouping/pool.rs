//! The camera-keyed pool of group buffers.
//!
//! Keeping one buffer per camera model prevents interleaved shots from two
//! cameras from fragmenting each other's groups. The cost is that which
//! camera's finished group is elected first depends on hash-map iteration
//! order; callers must not depend on cross-camera arrival order.

use std::collections::HashMap;

use ahash::RandomState;
use hifitime::Epoch;

use crate::constants::{CameraModel, CityKey};
use crate::grouping::buffer::GroupBuffer;
use crate::records::time_index::{RecordId, TimeSlice, TimeSliceExt};

#[derive(Debug, Default)]
pub(crate) struct GroupBufferPool {
    buffers: HashMap<CameraModel, GroupBuffer, RandomState>,
}

impl GroupBufferPool {
    pub fn new() -> Self {
        GroupBufferPool {
            buffers: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Route one image to its camera's buffer, creating the buffer around
    /// the image if this is the first sight of the camera.
    pub fn push(&mut self, nearest_city_key: &str, id: RecordId, records: &mut TimeSlice) {
        let camera_model = records.record(id).camera_model.clone();

        match self.buffers.get_mut(&camera_model) {
            Some(buffer) => buffer.push(nearest_city_key, id, records),
            None => {
                self.buffers
                    .insert(camera_model, GroupBuffer::seed(nearest_city_key, id, records));
            }
        }
    }

    /// Some camera whose buffer holds a complete group, if any. Election
    /// order across cameras is unspecified.
    pub fn any_complete(&self) -> Option<&str> {
        self.buffers
            .iter()
            .find(|(_, buffer)| buffer.has_complete_group())
            .map(|(camera_model, _)| camera_model.as_str())
    }

    /// Some camera whose buffer holds only a partial group, if any.
    pub fn any_partial(&self) -> Option<&str> {
        self.buffers
            .iter()
            .find(|(_, buffer)| buffer.has_partial_group())
            .map(|(camera_model, _)| camera_model.as_str())
    }

    /// Camera models with buffered images, for diagnostics. Unordered.
    pub fn buffered_camera_models(&self) -> Vec<&str> {
        self.buffers.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Pop a complete group from some camera's buffer, dropping the buffer
    /// if that drained it.
    pub fn pop_first_complete_group(
        &mut self,
    ) -> (Epoch, CityKey, CameraModel, Vec<RecordId>) {
        let camera_model = self
            .any_complete()
            .expect("can not pop a complete group if we do not have one")
            .to_string();

        let buffer = self
            .buffers
            .get_mut(&camera_model)
            .expect("elected camera must have a buffer");
        let time_key = buffer.first_time_key();

        let (nearest_city_key, group) = buffer.pop_complete_group();
        if buffer.is_empty() {
            self.buffers.remove(&camera_model);
        }

        (time_key, nearest_city_key, camera_model, group)
    }

    /// Flush one camera's partial group. Only legal once no camera holds a
    /// complete group; the buffer must drain entirely and is dropped.
    pub fn pop_first_partial_group(
        &mut self,
    ) -> (Epoch, CityKey, CameraModel, Vec<RecordId>) {
        if let Some(camera_model) = self.any_complete() {
            panic!(
                "can not pop a partial group if we still have complete groups: [{camera_model}]"
            );
        }

        let camera_model = self
            .any_partial()
            .expect("can not pop a partial group if we do not have one")
            .to_string();

        let buffer = self
            .buffers
            .get_mut(&camera_model)
            .expect("elected camera must have a buffer");
        let time_key = buffer.first_time_key();

        let (nearest_city_key, group) = buffer.pop_partial_group();
        assert!(
            buffer.is_empty(),
            "we expected buffer to be empty after popping a partial group from it: [{camera_model}]"
        );
        self.buffers.remove(&camera_model);

        (time_key, nearest_city_key, camera_model, group)
    }
}
