//! Variant-sized node records.
//!
//! Every node begins with a common [`NodeHeader`]; the node class determines
//! which additional attributes it carries. Unlike the hashmap this crate is
//! modeled on, which stores node classes as differently-sized trailing data
//! behind a fixed header, here that's just an [`enum`](Node) — the host
//! language already gives safe variant-sized storage.

use crate::ident::NodeId;
use crate::value::Value;

/// Discriminant of a [`Node`], independent of its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeClass {
  Object,
  Variable,
  Method,
  ObjectType,
  VariableType,
  ReferenceType,
  DataType,
  View,
}

/// A single reference from or to another node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
  pub reference_type: NodeId,
  pub is_forward: bool,
  pub target: NodeId,
}

/// Fields common to every node class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeHeader {
  pub node_id: NodeId,
  pub browse_name: String,
  pub display_name: String,
  pub description: String,
  pub write_mask: u32,
  pub references: Vec<Reference>,
}

impl NodeHeader {
  #[must_use]
  pub fn new(node_id: NodeId) -> Self {
    Self {
      node_id,
      browse_name: String::new(),
      display_name: String::new(),
      description: String::new(),
      write_mask: 0,
      references: Vec::new(),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectNode {
  pub header: NodeHeader,
  pub event_notifier: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableNode {
  pub header: NodeHeader,
  pub value: Value,
  pub data_type: NodeId,
  pub value_rank: i32,
  pub access_level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodNode {
  pub header: NodeHeader,
  pub executable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectTypeNode {
  pub header: NodeHeader,
  pub is_abstract: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableTypeNode {
  pub header: NodeHeader,
  pub value: Value,
  pub data_type: NodeId,
  pub is_abstract: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceTypeNode {
  pub header: NodeHeader,
  pub is_abstract: bool,
  pub symmetric: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataTypeNode {
  pub header: NodeHeader,
  pub is_abstract: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewNode {
  pub header: NodeHeader,
  pub contains_no_loops: bool,
  pub event_notifier: u8,
}

/// A node in the address space.
///
/// Node records are sized once at construction (via [`Node::new`]) and never
/// change class afterward.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
  Object(ObjectNode),
  Variable(VariableNode),
  Method(MethodNode),
  ObjectType(ObjectTypeNode),
  VariableType(VariableTypeNode),
  ReferenceType(ReferenceTypeNode),
  DataType(DataTypeNode),
  View(ViewNode),
}

impl Node {
  /// Allocates a fresh, unattached node of the given class.
  ///
  /// The returned node is not yet reachable from any store; the caller must
  /// either insert it (consuming it) or drop it.
  #[must_use]
  pub fn new(class: NodeClass, node_id: NodeId) -> Self {
    let header = NodeHeader::new(node_id);
    match class {
      NodeClass::Object => Node::Object(ObjectNode { header, event_notifier: 0 }),
      NodeClass::Variable => Node::Variable(VariableNode {
        header,
        value: Value::Empty,
        data_type: NodeId::numeric(0, 0),
        value_rank: -1,
        access_level: 1,
      }),
      NodeClass::Method => Node::Method(MethodNode { header, executable: true }),
      NodeClass::ObjectType => Node::ObjectType(ObjectTypeNode { header, is_abstract: false }),
      NodeClass::VariableType => Node::VariableType(VariableTypeNode {
        header,
        value: Value::Empty,
        data_type: NodeId::numeric(0, 0),
        is_abstract: false,
      }),
      NodeClass::ReferenceType => {
        Node::ReferenceType(ReferenceTypeNode { header, is_abstract: false, symmetric: false })
      }
      NodeClass::DataType => Node::DataType(DataTypeNode { header, is_abstract: false }),
      NodeClass::View => {
        Node::View(ViewNode { header, contains_no_loops: false, event_notifier: 0 })
      }
    }
  }

  #[must_use]
  pub fn node_class(&self) -> NodeClass {
    match self {
      Node::Object(_) => NodeClass::Object,
      Node::Variable(_) => NodeClass::Variable,
      Node::Method(_) => NodeClass::Method,
      Node::ObjectType(_) => NodeClass::ObjectType,
      Node::VariableType(_) => NodeClass::VariableType,
      Node::ReferenceType(_) => NodeClass::ReferenceType,
      Node::DataType(_) => NodeClass::DataType,
      Node::View(_) => NodeClass::View,
    }
  }

  #[must_use]
  pub fn header(&self) -> &NodeHeader {
    match self {
      Node::Object(n) => &n.header,
      Node::Variable(n) => &n.header,
      Node::Method(n) => &n.header,
      Node::ObjectType(n) => &n.header,
      Node::VariableType(n) => &n.header,
      Node::ReferenceType(n) => &n.header,
      Node::DataType(n) => &n.header,
      Node::View(n) => &n.header,
    }
  }

  #[must_use]
  pub fn header_mut(&mut self) -> &mut NodeHeader {
    match self {
      Node::Object(n) => &mut n.header,
      Node::Variable(n) => &mut n.header,
      Node::Method(n) => &mut n.header,
      Node::ObjectType(n) => &mut n.header,
      Node::VariableType(n) => &mut n.header,
      Node::ReferenceType(n) => &mut n.header,
      Node::DataType(n) => &mut n.header,
      Node::View(n) => &mut n.header,
    }
  }

  #[must_use]
  pub fn node_id(&self) -> &NodeId {
    &self.header().node_id
  }

  /// The current value, for node classes that carry one (Variable and
  /// VariableType). `None` for all other classes.
  #[must_use]
  pub fn value(&self) -> Option<&Value> {
    match self {
      Node::Variable(n) => Some(&n.value),
      Node::VariableType(n) => Some(&n.value),
      _ => None,
    }
  }
}
