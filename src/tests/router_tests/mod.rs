mod status_routes_tests;
