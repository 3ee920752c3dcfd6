/*!
The user guide

*This module doesn't contain any APIs or code. It contains only the documentation.*

A node is the part of the program that does whatever the program is for. Everything around it (the
command line, the configuration file, logging, the pid file and signals) is the same from one
node to another and lives in this crate. The [crate level documentation][crate] shows how the
two fit together.

You'll find here:

* [Testing a node][self::testing]
*/

pub mod testing;
