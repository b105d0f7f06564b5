//! Capability traits over a camera's GenICam-style node map.
//!
//! A binding exposes its node map through [`NodeAccess`]: string-keyed
//! lookups that hand back opaque handles, each answering the three
//! [`Node`] capability queries.  The free functions in this module wrap the
//! lookup-and-validate dance every caller needs, so that an absent node, a
//! read-only node, and an unreadable entry all surface as a [`NodeError`]
//! naming the offending node.

use spinslim_types::{NodeError, SdkError};

/// Capability queries answered by every node handle.
pub trait Node {
    /// The node exists on this device and is currently implemented.
    fn is_available(&self) -> bool;

    /// The node's value may be read right now.
    fn is_readable(&self) -> bool;

    /// The node's value may be written (or the command executed) right now.
    fn is_writable(&self) -> bool;
}

/// Access to one node map (device or stream) of a camera.
///
/// Lookups return `None` when the binding has no node of that name.  Writes
/// and command executions return the binding's [`SdkError`] unchanged; the
/// helpers in this module attach the node name.
pub trait NodeAccess {
    /// Handle to an enumeration node (`TriggerMode`, `PixelFormat`, …).
    type Enumeration: Node;
    /// Handle to one entry of an enumeration node (`On`, `RGB8`, …).
    type Entry: Node;
    /// Handle to a command node (`TriggerSoftware`).
    type Command: Node;
    /// Handle to an integer node (`Width`, `Height`).
    type Integer: Node;

    fn enumeration_node(&self, name: &str) -> Option<Self::Enumeration>;

    fn entry(&self, node: &Self::Enumeration, entry_name: &str) -> Option<Self::Entry>;

    /// Write `entry`'s value into `node`.
    fn set_enum_value(
        &mut self,
        node: &Self::Enumeration,
        entry: &Self::Entry,
    ) -> Result<(), SdkError>;

    fn command_node(&self, name: &str) -> Option<Self::Command>;

    fn execute_command(&mut self, node: &Self::Command) -> Result<(), SdkError>;

    fn integer_node(&self, name: &str) -> Option<Self::Integer>;

    fn integer_value(&self, node: &Self::Integer) -> Result<i64, SdkError>;
}

/// `"Node.Entry"`, the name used when reporting an entry failure.
pub fn qualified(node_name: &str, entry_name: &str) -> String {
    format!("{node_name}.{entry_name}")
}

/// Look up an enumeration node that is available and writable.
///
/// # Errors
///
/// [`NodeError::NodeUnavailable`] when the node is absent, unavailable, or
/// read-only.
pub fn writable_enumeration<N: NodeAccess + ?Sized>(
    nodes: &N,
    name: &str,
) -> Result<N::Enumeration, NodeError> {
    match nodes.enumeration_node(name) {
        Some(node) if node.is_available() && node.is_writable() => Ok(node),
        _ => Err(NodeError::NodeUnavailable(name.to_string())),
    }
}

/// Look up an entry of `node` that is available and readable.
///
/// # Errors
///
/// [`NodeError::EntryUnavailable`] carrying `"node_name.entry_name"`.
pub fn readable_entry<N: NodeAccess + ?Sized>(
    nodes: &N,
    node: &N::Enumeration,
    node_name: &str,
    entry_name: &str,
) -> Result<N::Entry, NodeError> {
    match nodes.entry(node, entry_name) {
        Some(entry) if entry.is_available() && entry.is_readable() => Ok(entry),
        _ => Err(NodeError::EntryUnavailable(qualified(node_name, entry_name))),
    }
}

/// Write an already validated entry into its enumeration node.
pub fn write_entry<N: NodeAccess + ?Sized>(
    nodes: &mut N,
    node: &N::Enumeration,
    node_name: &str,
    entry: &N::Entry,
) -> Result<(), NodeError> {
    nodes
        .set_enum_value(node, entry)
        .map_err(|cause| NodeError::WriteFailed {
            node: node_name.to_string(),
            cause,
        })
}

/// Look up `node_name`, validate its `entry_name` entry, and write it.
pub fn set_enum_entry<N: NodeAccess + ?Sized>(
    nodes: &mut N,
    node_name: &str,
    entry_name: &str,
) -> Result<(), NodeError> {
    let node = writable_enumeration(nodes, node_name)?;
    let entry = readable_entry(nodes, &node, node_name, entry_name)?;
    write_entry(nodes, &node, node_name, &entry)
}

/// Look up a command node that is available and writable.
pub fn writable_command<N: NodeAccess + ?Sized>(
    nodes: &N,
    name: &str,
) -> Result<N::Command, NodeError> {
    match nodes.command_node(name) {
        Some(node) if node.is_available() && node.is_writable() => Ok(node),
        _ => Err(NodeError::NodeUnavailable(name.to_string())),
    }
}

/// Look up and execute the command node `name`.
///
/// # Errors
///
/// [`NodeError::NodeUnavailable`] if the command cannot be executed, or
/// [`NodeError::CommandExecutionFailed`] if the device rejects it.
pub fn execute<N: NodeAccess + ?Sized>(nodes: &mut N, name: &str) -> Result<(), NodeError> {
    let command = writable_command(nodes, name)?;
    nodes
        .execute_command(&command)
        .map_err(|cause| NodeError::CommandExecutionFailed {
            node: name.to_string(),
            cause,
        })
}

/// Read the integer node `name`.
pub fn read_integer<N: NodeAccess + ?Sized>(nodes: &N, name: &str) -> Result<i64, NodeError> {
    let node = match nodes.integer_node(name) {
        Some(node) if node.is_available() && node.is_readable() => node,
        _ => return Err(NodeError::NodeUnavailable(name.to_string())),
    };
    nodes.integer_value(&node).map_err(|cause| NodeError::ReadFailed {
        node: name.to_string(),
        cause,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    struct Flags(bool, bool, bool);

    impl Node for Flags {
        fn is_available(&self) -> bool {
            self.0
        }
        fn is_readable(&self) -> bool {
            self.1
        }
        fn is_writable(&self) -> bool {
            self.2
        }
    }

    /// One enumeration `Mode` with entries `A` (readable) and `B`
    /// (unreadable), one command, one integer.
    struct MockNodes {
        mode: Flags,
        writes: Vec<bool>,
        executed: usize,
        reject_execute: bool,
    }

    impl MockNodes {
        fn new() -> Self {
            Self {
                mode: Flags(true, true, true),
                writes: Vec::new(),
                executed: 0,
                reject_execute: false,
            }
        }
    }

    impl NodeAccess for MockNodes {
        type Enumeration = Flags;
        type Entry = Flags;
        type Command = Flags;
        type Integer = Flags;

        fn enumeration_node(&self, name: &str) -> Option<Flags> {
            (name == "Mode").then_some(self.mode)
        }
        fn entry(&self, _node: &Flags, entry_name: &str) -> Option<Flags> {
            match entry_name {
                "A" => Some(Flags(true, true, false)),
                "B" => Some(Flags(true, false, false)),
                _ => None,
            }
        }
        fn set_enum_value(&mut self, _node: &Flags, entry: &Flags) -> Result<(), SdkError> {
            self.writes.push(entry.is_readable());
            Ok(())
        }
        fn command_node(&self, name: &str) -> Option<Flags> {
            (name == "Go").then_some(Flags(true, false, true))
        }
        fn execute_command(&mut self, _node: &Flags) -> Result<(), SdkError> {
            if self.reject_execute {
                return Err(SdkError::new(-1002, "access denied"));
            }
            self.executed += 1;
            Ok(())
        }
        fn integer_node(&self, name: &str) -> Option<Flags> {
            (name == "Width").then_some(Flags(true, true, false))
        }
        fn integer_value(&self, _node: &Flags) -> Result<i64, SdkError> {
            Ok(640)
        }
    }

    #[test]
    fn set_enum_entry_writes_readable_entry() {
        let mut nodes = MockNodes::new();
        set_enum_entry(&mut nodes, "Mode", "A").unwrap();
        assert_eq!(nodes.writes, vec![true]);
    }

    #[test]
    fn unreadable_entry_is_reported_with_qualified_name() {
        let mut nodes = MockNodes::new();
        let err = set_enum_entry(&mut nodes, "Mode", "B").unwrap_err();
        assert_eq!(err, NodeError::EntryUnavailable("Mode.B".to_string()));
        assert!(nodes.writes.is_empty());
    }

    #[test]
    fn read_only_enumeration_is_unavailable() {
        let mut nodes = MockNodes::new();
        nodes.mode = Flags(true, true, false);
        let err = set_enum_entry(&mut nodes, "Mode", "A").unwrap_err();
        assert_eq!(err, NodeError::NodeUnavailable("Mode".to_string()));
    }

    #[test]
    fn missing_enumeration_is_unavailable() {
        let nodes = MockNodes::new();
        assert!(matches!(
            writable_enumeration(&nodes, "Gain"),
            Err(NodeError::NodeUnavailable(name)) if name == "Gain"
        ));
    }

    #[test]
    fn execute_attaches_node_name_to_sdk_failure() {
        let mut nodes = MockNodes::new();
        execute(&mut nodes, "Go").unwrap();
        assert_eq!(nodes.executed, 1);

        nodes.reject_execute = true;
        match execute(&mut nodes, "Go") {
            Err(NodeError::CommandExecutionFailed { node, cause }) => {
                assert_eq!(node, "Go");
                assert_eq!(cause.code, -1002);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn read_integer_returns_value() {
        let nodes = MockNodes::new();
        assert_eq!(read_integer(&nodes, "Width").unwrap(), 640);
        assert_eq!(
            read_integer(&nodes, "Height").unwrap_err(),
            NodeError::NodeUnavailable("Height".to_string())
        );
    }
}
