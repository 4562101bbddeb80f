mod runtime_tests;
