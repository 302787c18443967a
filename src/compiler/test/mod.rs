mod compile_test;
