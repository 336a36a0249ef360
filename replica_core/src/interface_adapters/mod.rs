// Interface adapters: wire protocol, in-process transport and presentation hooks.

pub mod net;
pub mod presentation;
pub mod protocol;
