mod uint256_tests;
