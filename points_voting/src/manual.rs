/*!

This is the long-form manual for `points_voting` and `pointstally`.

## Scoring

Each ballot ranks between one and three contestants of the region it is cast in.

| preference | points |
|------------|--------|
| first      | 3      |
| second     | 2      |
| third      | 1      |

A ballot with fewer than three preferences simply grants fewer points: the unused
points are not given to anyone.

Points are counted in two scopes at the same time:
- the region of the ballot. The contestant with the most points is the head of the region.
- the whole election. A contestant running in several regions sums the points
  obtained in all of them. The contestant with the most points is the overall winner.

Every contestant running in a scope appears in its standings, with zero points if no
ballot mentioned them. Contestants registered but running in no region do not appear.

## Invalid ballots

A ballot does not count at all (none of its preferences get points) when:
- its region is not part of the election
- it lists no preference, or more than three
- one of the preferences is not running in the region of the ballot
- the same contestant is listed more than once, unless the rules allow duplicates
  (`rejectDuplicatePreferences: false`). In that case, the contestant gets the points
  of every slot it occupies.

Invalid ballots do not stop the count. They are reported with the reason for the
rejection, and the number of accepted and rejected ballots is part of the results.
The voter id is only used for these reports: two ballots with the same voter id both count.

## Ties

When several contestants share the highest score, the winner is picked according to
the tiebreak mode:
- `nameAscending` (default): the name that comes first in alphabetical order wins.
- `useContestantOrder`: the contestant registered first wins.

The results mention when a tiebreak was necessary. The same ballots always produce the
same results.

## Input formats

### `dat`

Plain text, one block per region:

```text
Khammam
v1 A B F
v2 B A
v3 A
//
Visakhapatnam
v5 B C G
//
&&
```

The first line of a block is the name of the region, the following lines are the
ballots (voter id followed by the preferences, separated by whitespace). A block ends
with `//` and the file ends with `&&`.

### `csv`

One ballot per row:

```text
region,voter,choice 1,choice 2,choice 3
North,n1,Alice,Bob,
North,n2,Bob,Alice,Carol
```

The region column can be omitted if the source sets a `region` for the whole file.
The id column is optional (an id is derived from the file name and the line number).
Empty cells at the end of a row are not preferences.

### `xlsx`

Same layout as `csv`, in an Excel worksheet.

## Configuration

```json
{
  "outputSettings": { "contestName": "Regional heads" },
  "ballotFileSources": [ { "provider": "dat", "filePath": "voting.dat" } ],
  "contestants": [ { "name": "A" }, { "name": "B" } ],
  "regions": [ { "name": "Khammam", "contestants": ["A", "B"] } ],
  "rules": { "tiebreakMode": "nameAscending", "rejectDuplicatePreferences": true }
}
```

Options for ballot file sources:
 - `provider` (string): `dat`, `csv` or `xlsx`
 - `filePath` (string): relative to the directory of the configuration file
 - `region` (string, optional): all the ballots of the file are cast in this region
 - `regionColumnIndex`, `idColumnIndex`, `firstVoteColumnIndex` (string or number,
   optional): 1-based column numbers or Excel column letters. Defaults: the region is
   in the first column, the id in the second one and the votes start after them.
 - `firstVoteRowIndex` (string or number, optional): the first row holding a ballot
   (1-based, default 1)
 - `excelWorksheetName` (string, optional): for Excel-based inputs, the name of
   the worksheet in Excel.

The `contestants` list is optional: without it, the contestants are taken from the rosters.

 */
