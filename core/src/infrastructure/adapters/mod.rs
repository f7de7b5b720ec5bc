// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! One adapter per `ToolKind` (spec §4.3). Each implements
//! `application::ptc_runtime::ToolAdapter`; the kind → adapter map is
//! assembled once by `application::hub::ToolHub`.

pub mod core_tools;
pub mod local_fn;
pub mod rpc_tool;
pub mod workflow_embedded;
pub mod workflow_remote;
pub mod workflow;
pub mod image_pipeline;
pub mod skill_adapter;

pub use core_tools::CoreToolsAdapter;
pub use local_fn::LocalFnAdapter;
pub use rpc_tool::RpcToolAdapter;
pub use workflow_embedded::{EmbeddedWorkflowEngine, WorkflowEmbeddedAdapter};
pub use workflow_remote::WorkflowRemoteAdapter;
pub use workflow::WorkflowAdapter;
pub use image_pipeline::ImagePipelineAdapter;
pub use skill_adapter::SkillAdapter;
