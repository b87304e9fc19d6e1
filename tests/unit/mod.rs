mod basic_tests;
mod replay_properties;
