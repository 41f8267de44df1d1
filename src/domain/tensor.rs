//! Model input description and the normalized image tensor.

use crate::core::DEFAULT_INPUT_SIZE;
use crate::processors::{ChannelOrder, ScalingPolicy};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Shape and numeric policy a model family expects its input in.
///
/// Two models sharing an `InputSpec` share one preprocessed tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSpec {
    /// Input height in pixels.
    pub height: u32,
    /// Input width in pixels.
    pub width: u32,
    /// Number of channels, 1 (grayscale) or 3 (RGB).
    pub channels: u32,
    /// Tensor memory layout.
    pub channel_order: ChannelOrder,
    /// Pixel scaling policy.
    pub scaling: ScalingPolicy,
}

impl InputSpec {
    /// 224x224 RGB, `[0, 1]` scaled, HWC; the layout of the Keras-exported models.
    pub fn keras_rgb() -> Self {
        Self {
            height: DEFAULT_INPUT_SIZE,
            width: DEFAULT_INPUT_SIZE,
            channels: 3,
            channel_order: ChannelOrder::HWC,
            scaling: ScalingPolicy::UnitRange,
        }
    }

    /// Sets the input size.
    pub fn with_size(mut self, height: u32, width: u32) -> Self {
        self.height = height;
        self.width = width;
        self
    }

    /// Sets the channel count.
    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = channels;
        self
    }

    /// Sets the channel order.
    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }

    /// Sets the scaling policy.
    pub fn with_scaling(mut self, scaling: ScalingPolicy) -> Self {
        self.scaling = scaling;
        self
    }

    /// Tensor shape including the leading batch dimension of 1.
    pub fn tensor_shape(&self) -> [usize; 4] {
        let (h, w, c) = (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        );
        match self.channel_order {
            ChannelOrder::CHW => [1, c, h, w],
            ChannelOrder::HWC => [1, h, w, c],
        }
    }
}

impl Default for InputSpec {
    fn default() -> Self {
        Self::keras_rgb()
    }
}

/// A preprocessed image ready for one model family.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    spec: InputSpec,
    data: Array4<f32>,
}

impl ImageTensor {
    /// Builds a tensor from raw values, checking the shape against `spec`.
    pub fn from_shape_vec(spec: InputSpec, values: Vec<f32>) -> Result<Self, ndarray::ShapeError> {
        let data = Array4::from_shape_vec(spec.tensor_shape(), values)?;
        Ok(Self { spec, data })
    }

    /// The family this tensor was produced for.
    pub fn spec(&self) -> &InputSpec {
        &self.spec
    }

    /// The tensor values.
    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Produces a tensor filled with `value`; handy for tests and warm-up calls.
    pub fn filled(spec: InputSpec, value: f32) -> Self {
        let data = Array4::from_elem(spec.tensor_shape(), value);
        Self { spec, data }
    }
}
