//! Pixel format, stream buffer handling, and image dimension nodes.

use spinslim_types::{BufferHandlingMode, NodeError, PixelFormat};
use tracing::{debug, instrument};

use crate::node::{self, NodeAccess};

/// Device enumeration node selecting the pixel format.
pub const PIXEL_FORMAT: &str = "PixelFormat";
/// Stream enumeration node selecting the buffer policy.
pub const BUFFER_HANDLING_MODE: &str = "StreamBufferHandlingMode";
pub const WIDTH: &str = "Width";
pub const HEIGHT: &str = "Height";

/// Write `format` into the device node map's `PixelFormat` node.
///
/// Must be called before acquisition begins; most devices lock the node
/// while streaming.
///
/// # Errors
///
/// [`NodeError::NodeUnavailable`] for `PixelFormat`, or
/// [`NodeError::EntryUnavailable`] (e.g. `PixelFormat.RGB8` on a mono
/// sensor).
#[instrument(skip(nodes))]
pub fn set_pixel_format<N: NodeAccess + ?Sized>(
    nodes: &mut N,
    format: PixelFormat,
) -> Result<(), NodeError> {
    node::set_enum_entry(nodes, PIXEL_FORMAT, format.entry_name())?;
    debug!("pixel format set");
    Ok(())
}

pub fn set_rgb<N: NodeAccess + ?Sized>(nodes: &mut N) -> Result<(), NodeError> {
    set_pixel_format(nodes, PixelFormat::Rgb8)
}

pub fn set_mono<N: NodeAccess + ?Sized>(nodes: &mut N) -> Result<(), NodeError> {
    set_pixel_format(nodes, PixelFormat::Mono8)
}

/// Write `mode` into the **stream** node map's `StreamBufferHandlingMode`.
#[instrument(skip(stream_nodes))]
pub fn set_buffer_handling<N: NodeAccess + ?Sized>(
    stream_nodes: &mut N,
    mode: BufferHandlingMode,
) -> Result<(), NodeError> {
    node::set_enum_entry(stream_nodes, BUFFER_HANDLING_MODE, mode.entry_name())?;
    debug!("buffer handling mode set");
    Ok(())
}

/// Current image size as `(height, width)`.
pub fn image_dims<N: NodeAccess + ?Sized>(nodes: &N) -> Result<(u32, u32), NodeError> {
    let width = node::read_integer(nodes, WIDTH)?;
    let height = node::read_integer(nodes, HEIGHT)?;
    Ok((clamp_dim(height), clamp_dim(width)))
}

fn clamp_dim(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{NodeFlags, SDK_ERR_ACCESS_DENIED, SimNodeMap};
    use spinslim_types::SdkError;

    #[test]
    fn set_rgb_and_mono_switch_entries() {
        let mut nodes = SimNodeMap::device();
        set_rgb(&mut nodes).unwrap();
        assert_eq!(nodes.enum_value(PIXEL_FORMAT), Some("RGB8"));
        set_mono(&mut nodes).unwrap();
        assert_eq!(nodes.enum_history(PIXEL_FORMAT), vec!["RGB8", "Mono8"]);
    }

    #[test]
    fn mono_only_sensor_rejects_rgb() {
        let mut nodes = SimNodeMap::device().with_enumeration(PIXEL_FORMAT, &["Mono8"], "Mono8");
        assert_eq!(
            set_rgb(&mut nodes).unwrap_err(),
            NodeError::EntryUnavailable("PixelFormat.RGB8".to_string())
        );
    }

    #[test]
    fn locked_pixel_format_is_unavailable() {
        let mut nodes = SimNodeMap::device().with_flags(PIXEL_FORMAT, NodeFlags::READ_ONLY);
        assert_eq!(
            set_mono(&mut nodes).unwrap_err(),
            NodeError::NodeUnavailable("PixelFormat".to_string())
        );
    }

    #[test]
    fn buffer_handling_targets_stream_node_map() {
        let mut stream = SimNodeMap::stream();
        set_buffer_handling(&mut stream, BufferHandlingMode::NewestOnly).unwrap();
        assert_eq!(stream.enum_value(BUFFER_HANDLING_MODE), Some("NewestOnly"));

        // The device node map has no such node.
        let mut device = SimNodeMap::device();
        assert_eq!(
            set_buffer_handling(&mut device, BufferHandlingMode::NewestOnly).unwrap_err(),
            NodeError::NodeUnavailable("StreamBufferHandlingMode".to_string())
        );
    }

    #[test]
    fn image_dims_is_height_then_width() {
        let mut nodes = SimNodeMap::device();
        assert_eq!(image_dims(&nodes).unwrap(), (48, 64));
        nodes.set_integer(WIDTH, 1440);
        nodes.set_integer(HEIGHT, 1080);
        assert_eq!(image_dims(&nodes).unwrap(), (1080, 1440));
    }

    #[test]
    fn rejected_dimension_read_is_read_failed() {
        let nodes = SimNodeMap::device().fail_read(
            HEIGHT,
            SdkError::new(SDK_ERR_ACCESS_DENIED, "not readable while streaming"),
        );
        match image_dims(&nodes) {
            Err(NodeError::ReadFailed { node, cause }) => {
                assert_eq!(node, "Height");
                assert_eq!(cause.code, SDK_ERR_ACCESS_DENIED);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
