pub mod attention_state_machine;
pub mod attention_status;
pub mod clock;
pub mod status_cell;
