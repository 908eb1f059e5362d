mod dispatcher_tests;
