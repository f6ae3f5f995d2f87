mod graph_integration_tests;
mod workspace_tests;
