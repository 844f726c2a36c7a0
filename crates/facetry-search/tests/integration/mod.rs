mod config_loading;
mod properties;
mod search_flow;
