//
// alldiff-cp is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License  v3
// as published by the Free Software Foundation.
//
// mini-cp is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY.
// See the GNU Lesser General Public License  for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with mini-cp. If not, see http://www.gnu.org/licenses/lgpl-3.0.en.html
//
// Copyright (c)  2022 by X. Gillard
//

//! The strongly connected components of the oriented support graph.
//!
//! The filtering uses Berge's theorem which states that an edge belongs to
//! **some** but not all maximum matching iff, for an arbitrary maximum
//! matching M, it belongs to either an even length alternating path that
//! starts at an M-free vertex (case 1), or an even length alternating cycle
//! (case 2). Régin treats both cases trough a simple graph transformation
//! where:
//!
//!  - Variables have an inbound edge from their matched value in M and an
//!    outbound edge towards the other values of their domain.
//!
//!  - Value nodes have an inbound edge from the sink if they belong to M
//!    and an outbound edge towards the sink if they dont.
//!
//! Thanks to this transformation, both cases reduce to the following
//! statement: an edge belongs to some maximum matching iff it either belongs
//! to M, or both its endpoints belong to the same strongly connected
//! component. All components are found using Kosaraju's algorithm.

use super::graph::{SupportGraph, ValueOffset, VariableId};
use super::matching::Matching;

/// Kosaraju's algorithm identifies all SCC in a graph by performing a double
/// DFS search in the graph. This status acts as a marker to tell whether a
/// node is open to being visited, if its successors have already been pushed
/// down the stack or if the complete subtree behind it has been visited.
///
/// # Note:
/// When a node is closed, the node id inside of the closed status corresponds
/// to the root of the dfs exploration which led to that node's closure. In
/// the context of SCC, this node identifier acts as an SCC identity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
enum VisitStatus {
    /// The node has not been expanded yet
    NotVisited,
    /// The successors of the node have been pushed on the stack
    Visited,
    /// The complete subtree of the node has been explored.
    Closed(NodeId),
}

/// Polymorphic node identifier. Variable nodes, value nodes and the sink
/// must be considered indistinctly when computing the components.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
enum NodeId {
    /// Uniquely identifies a variable node
    Var(VariableId),
    /// Uniquely identifies a value node
    Val(ValueOffset),
    /// Uniquely identifies the sink of the transformed graph.
    Sink,
}

/// The adjacency of one node of the oriented graph
#[derive(Debug, Clone)]
struct Node {
    /// Inbound nodes
    inbound: Vec<NodeId>,
    /// Outbound nodes
    outbound: Vec<NodeId>,
    /// Visit status
    status: VisitStatus,
}
impl Default for Node {
    fn default() -> Self {
        Self {
            inbound: vec![],
            outbound: vec![],
            status: VisitStatus::NotVisited,
        }
    }
}
impl Node {
    fn clear(&mut self) {
        self.inbound.clear();
        self.outbound.clear();
        self.status = VisitStatus::NotVisited;
    }
}

/// The strongly connected components of the oriented graph. All buffers are
/// kept from one computation to the next to avoid repeated allocations.
#[derive(Debug, Clone)]
pub struct Components {
    /// The variable nodes
    variables: Vec<Node>,
    /// The value nodes
    values: Vec<Node>,
    /// The sink (dummy node of the transformed graph)
    sink: Node,
    /// The dfs stack
    stack: Vec<NodeId>,
    /// The suffix order computed by the first dfs
    suffix_order: Vec<NodeId>,
}

impl Components {
    /// Creates the buffers for a graph having the given number of nodes
    pub fn new(n_vars: usize, n_vals: usize) -> Self {
        Self {
            variables: vec![Node::default(); n_vars],
            values: vec![Node::default(); n_vals],
            sink: Node::default(),
            stack: vec![],
            suffix_order: vec![],
        }
    }
    /// Orients the support graph according to the matching and computes all
    /// of its strongly connected components.
    pub fn compute(&mut self, graph: &SupportGraph, matching: &Matching) {
        self.orient(graph, matching);
        self.kosaraju();
    }
    /// Returns true iff `var` and `off` lie in different components. The edge
    /// connecting them (if any and unless it is matched) belongs to no
    /// maximum matching.
    pub fn separates(&self, var: VariableId, off: ValueOffset) -> bool {
        self.get_status(NodeId::Var(var)) != self.get_status(NodeId::Val(off))
    }

    /// prepares the transformed var value graph where there is:
    ///
    /// * one outgoing arc from each variable node to each value node in its
    ///   domain ++except for the value to which the variable is matched++
    /// * one inbound arc to each varible node from its matched value
    /// * the values not participating in the maximum matching have an outgoing
    ///   arc towards the sink
    /// * the values participating in the maximum matching have an incoming arc
    ///   from the graph sink
    fn orient(&mut self, graph: &SupportGraph, matching: &Matching) {
        self.variables.iter_mut().for_each(Node::clear);
        self.values.iter_mut().for_each(Node::clear);
        self.sink.clear();

        for (i, node) in self.variables.iter_mut().enumerate() {
            let var = VariableId(i);
            let mate = matching.value_of(var);
            for off in graph.neighbours(var).iter().copied() {
                if Some(off) == mate {
                    node.inbound.push(NodeId::Val(off));
                    self.values[off.0].outbound.push(NodeId::Var(var));
                } else {
                    node.outbound.push(NodeId::Val(off));
                    self.values[off.0].inbound.push(NodeId::Var(var));
                }
            }
        }

        for (i, node) in self.values.iter_mut().enumerate() {
            let off = ValueOffset(i);
            if matching.variable_of(off).is_some() {
                node.inbound.push(NodeId::Sink);
                self.sink.outbound.push(NodeId::Val(off));
            } else {
                node.outbound.push(NodeId::Sink);
                self.sink.inbound.push(NodeId::Val(off));
            }
        }
    }

    /// This function executes kosaraju's algorithm to find
    /// components in the transformed variable value graph.
    fn kosaraju(&mut self) {
        self.suffix_order.clear();
        for i in 0..self.variables.len() {
            self.dfs(NodeId::Var(VariableId(i)), true);
        }
        for i in 0..self.values.len() {
            self.dfs(NodeId::Val(ValueOffset(i)), true);
        }
        self.dfs(NodeId::Sink, true);

        self.clear_visit_status();
        // the suffix order is now ready, we can peform a dfs traversal
        // of the transposed graph in the reverse suffix order
        while let Some(id) = self.suffix_order.pop() {
            self.dfs(id, false);
        }
    }

    /// Performs one of the two dfs traversals of kosaraju's algorithm from
    /// the given root. The first one (`forward`) follows the arcs of the
    /// graph and populates the suffix order. The second one follows the arcs
    /// of the transposed graph and labels every node with the root of its
    /// component.
    fn dfs(&mut self, root: NodeId, forward: bool) {
        if self.get_status(root) != VisitStatus::NotVisited {
            return;
        }
        let mut stack = std::mem::take(&mut self.stack);
        stack.push(root);

        while let Some(current) = stack.pop() {
            match self.get_status(current) {
                VisitStatus::NotVisited => {
                    stack.push(current); // leave it on the stack for now
                    self.set_status(current, VisitStatus::Visited);
                    let adjacent = if forward {
                        self.outbound(current)
                    } else {
                        self.inbound(current)
                    };
                    for adj in adjacent.iter().copied() {
                        if self.get_status(adj) == VisitStatus::NotVisited {
                            stack.push(adj);
                        }
                    }
                }
                VisitStatus::Visited => {
                    if forward {
                        self.suffix_order.push(current);
                    }
                    self.set_status(current, VisitStatus::Closed(root));
                }
                VisitStatus::Closed(_) => { /* do nothing, that's ok */ }
            }
        }
        self.stack = stack;
    }

    /// clears the visit status of all nodes
    fn clear_visit_status(&mut self) {
        self.variables
            .iter_mut()
            .for_each(|v| v.status = VisitStatus::NotVisited);
        self.values
            .iter_mut()
            .for_each(|v| v.status = VisitStatus::NotVisited);
        self.sink.status = VisitStatus::NotVisited;
    }
    /// Returns the node identified by `id`
    fn node(&self, id: NodeId) -> &Node {
        match id {
            NodeId::Var(id) => &self.variables[id.0],
            NodeId::Val(id) => &self.values[id.0],
            NodeId::Sink => &self.sink,
        }
    }
    /// Lists the nodes having an arc directed towards `id`
    fn inbound(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).inbound
    }
    /// Lists the nodes towards which `id` has an arc
    fn outbound(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).outbound
    }
    /// Returns the visit status of the node identified with `id`
    fn get_status(&self, id: NodeId) -> VisitStatus {
        self.node(id).status
    }
    /// Updates the visit status of the node identified with `id`
    fn set_status(&mut self, id: NodeId, status: VisitStatus) {
        match id {
            NodeId::Var(id) => self.variables[id.0].status = status,
            NodeId::Val(id) => self.values[id.0].status = status,
            NodeId::Sink => self.sink.status = status,
        }
    }
}
