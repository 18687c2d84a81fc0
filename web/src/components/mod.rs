mod create_group;
mod groups;
mod top_nav;

pub use create_group::CreateGroupModal;
pub use groups::GroupsPage;
pub use top_nav::TopNav;
