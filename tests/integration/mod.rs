mod basic_integration;
mod cross_context;
