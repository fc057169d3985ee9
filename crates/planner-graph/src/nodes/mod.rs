pub mod agent_node;
pub mod reflect_node;
pub mod tool_node;
pub mod user_input_node;

pub use agent_node::AgentNode;
pub use reflect_node::ReflectNode;
pub use tool_node::ToolNode;
pub use user_input_node::UserInputNode;
