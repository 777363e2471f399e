use crate::graph::{
    amplify::{Amplify, Gain},
    mix::Mix,
    node::GraphNode,
};

pub trait NodeExt: GraphNode + Sized {
    fn amplify<M>(self, modulator: M) -> Amplify<Self, M> {
        Amplify::new(self, modulator)
    }

    fn gain(self, gain: f32) -> Gain<Self> {
        Gain { signal: self, gain }
    }

    fn mix<M: GraphNode>(self, source: M, balance: f32) -> Mix<Self, M> {
        Mix::new(self, source, balance)
    }

    fn sum<M: GraphNode>(self, source: M) -> Mix<Self, M> {
        Mix::weighted(self, source, 1.0, 1.0)
    }

    fn boxed(self) -> Box<dyn GraphNode>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<T: GraphNode> NodeExt for T {}
