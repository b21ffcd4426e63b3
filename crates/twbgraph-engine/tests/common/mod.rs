//! Workbook fixtures built in memory

use std::io::{Cursor, Write};
use zip::write::FileOptions;

/// A workbook with two data sources, calculated fields and worksheet usage
pub const SUPERSTORE_TWB: &str = r#"<?xml version='1.0' encoding='utf-8' ?>
<workbook source-build='2023.1.0' version='18.1'>
  <datasources>
    <datasource hasconnection='false' inline='true' name='Parameters' version='18.1'>
      <aliases enabled='yes' />
      <column caption='Target Margin' datatype='real' name='[Parameter 1]' param-domain-type='range' role='measure' type='quantitative' value='0.2'>
        <calculation class='tableau' formula='0.2' />
      </column>
    </datasource>
    <datasource caption='Orders (Superstore)' inline='true' name='federated.0a1b2c' version='18.1'>
      <connection class='federated'>
        <metadata-records>
          <metadata-record class='column'>
            <remote-name>Sales</remote-name>
            <local-name>[Sales]</local-name>
            <local-type>real</local-type>
            <aggregation>Sum</aggregation>
          </metadata-record>
          <metadata-record class='column'>
            <remote-name>Region</remote-name>
            <local-name>[Region]</local-name>
            <local-type>string</local-type>
            <aggregation>Count</aggregation>
          </metadata-record>
        </metadata-records>
      </connection>
      <column datatype='real' name='[Sales]' role='measure' type='quantitative' />
      <column datatype='real' name='[Profit]' role='measure' type='quantitative' />
      <column caption='Profit Ratio' datatype='real' name='[Calculation_101]' role='measure' type='quantitative'>
        <calculation class='tableau' formula='SUM([Profit])/SUM([Sales])' />
        <desc><formatted-text><run>Share of sales kept as profit</run></formatted-text></desc>
      </column>
      <column caption='Above Target' datatype='boolean' name='[Calculation_102]' role='dimension' type='nominal' hidden='true'>
        <calculation class='tableau' formula='[Profit Ratio] &gt; [Parameters].[Target Margin]' />
      </column>
    </datasource>
  </datasources>
  <worksheets>
    <worksheet name='Profitability'>
      <table>
        <view>
          <datasources>
            <datasource caption='Orders (Superstore)' name='federated.0a1b2c' />
          </datasources>
          <datasource-dependencies datasource='federated.0a1b2c'>
            <column datatype='real' name='[Sales]' role='measure' type='quantitative' />
            <column-instance column='[Calculation_101]' derivation='User' name='[usr:Calculation_101:qk]' pivot='key' type='quantitative' />
          </datasource-dependencies>
        </view>
      </table>
    </worksheet>
  </worksheets>
</workbook>
"#;

/// A second workbook reusing the Sales field name
pub const RETURNS_TWB: &str = r#"<?xml version='1.0' encoding='utf-8' ?>
<workbook version='18.1'>
  <datasources>
    <datasource caption='Returns' name='federated.9z8y7x'>
      <column datatype='real' name='[Sales]' role='measure' type='quantitative' />
      <column caption='Return Rate' datatype='real' name='[Calculation_201]' role='measure' type='quantitative'>
        <calculation class='tableau' formula='SUM([Returned Sales]) / SUM([Sales])' />
      </column>
    </datasource>
  </datasources>
</workbook>
"#;

/// Zip the given entries into a packaged workbook
pub fn bundle(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// `Superstore.twbx`: the workbook plus an extract blob
pub fn superstore_twbx() -> Vec<u8> {
    bundle(&[
        ("Data/Extracts/orders.hyper", b"\x00\x01binary".as_slice()),
        ("Superstore.twb", SUPERSTORE_TWB.as_bytes()),
    ])
}
